use anyhow::Result;
use chrono::Local;
use std::io::Write;

use super::{
    render::Console,
    report::{DiagnosticReport, HardwareOutcome, ProbeOutcome, Verdict, TOTAL_TESTS},
    traits::HardwareConsent,
    ConnectFailed, DiagnosticConfig,
};
use crate::{
    core::{CancelFlag, Interrupted},
    i18n::lang,
    protocol::{Command, LineChannel, SensorReading, SerialLink},
    utils::sleep::wait_for_board_reset,
};

/// Run the full probe sequence against the link produced by `open`.
///
/// `open` failing is fatal and returns an error carrying [`ConnectFailed`].
/// Errors inside a single exchange become an `ERROR: <message>` reply line
/// and only fail that probe. [`Interrupted`] ends the run at any point. The
/// link is dropped before this function returns on every path.
pub fn run_diagnostic<L, O, W>(
    config: &DiagnosticConfig,
    open: O,
    consent: &mut dyn HardwareConsent,
    cancel: &CancelFlag,
    console: &mut Console<W>,
) -> Result<DiagnosticReport>
where
    L: SerialLink,
    O: FnOnce(&DiagnosticConfig) -> Result<L>,
    W: Write,
{
    let l = lang();
    let started_at = Local::now();

    console.header(&config.port_name, config.baud_rate)?;
    console.phase(&l.phase_connection)?;

    let link = match open(config) {
        Ok(link) => link,
        Err(err) => {
            log::error!("Cannot open {}: {err:#}", config.port_name);
            console.check(&l.test_connection, false, Some(&format!("{err:#}")))?;
            return Err(err.context(ConnectFailed {
                port: config.port_name.clone(),
            }));
        }
    };
    let mut channel = LineChannel::new(link).with_idle_gap(config.idle_gap);

    wait_for_board_reset(config.reset_delay, cancel)?;
    let endpoint = format!("{} @ {}", config.port_name, config.baud_rate);
    console.check(&l.test_connection, true, Some(&endpoint))?;

    let boot_messages = read_boot_banner(&mut channel, config, cancel)?;
    console.boot_messages(&boot_messages)?;
    console.blank()?;

    console.phase(&l.phase_commands)?;
    let ping = probe(&mut channel, Command::Ping, config, cancel)?;
    console.ping(&ping)?;
    let status = probe(&mut channel, Command::Status, config, cancel)?;
    console.status(&status)?;
    let count = probe(&mut channel, Command::Count, config, cancel)?;
    console.count(&count)?;
    let info = probe(&mut channel, Command::Info, config, cancel)?;
    console.info(&info)?;
    console.blank()?;

    let sensor = SensorReading::scan(&info.responses);
    let baud_synced = sensor.baud_matches(config.baud_rate);
    let passed = DiagnosticReport::tally(&ping, &status, &count, &info, &sensor, baud_synced);

    let mut report = DiagnosticReport {
        started_at,
        port: config.port_name.clone(),
        baud_rate: config.baud_rate,
        boot_messages,
        ping,
        status,
        count,
        info,
        sensor,
        baud_synced,
        hardware: HardwareOutcome::Skipped,
        passed,
        total: TOTAL_TESTS,
        verdict: Verdict::from_tally(passed),
    };

    console.phase(&l.phase_sensor)?;
    console.sensor(&report)?;
    console.blank()?;

    console.phase(&l.phase_hardware)?;
    console.flush()?;
    if consent.confirm(&l.prompt_hardware, cancel)? {
        let hardware = probe(&mut channel, Command::Hardware, config, cancel)?;
        console.hardware(&hardware)?;
        report.hardware = HardwareOutcome::Ran { probe: hardware };
    } else {
        console.hardware_skipped()?;
    }
    console.blank()?;

    console.summary(&report)?;
    console.command_reference()?;

    drop(channel);
    log::info!("Closed {}", config.port_name);
    console.port_closed()?;
    console.flush()?;

    Ok(report)
}

/// Lines the firmware prints after reset. Read failures only mean "no banner".
fn read_boot_banner<L: SerialLink>(
    channel: &mut LineChannel<L>,
    config: &DiagnosticConfig,
    cancel: &CancelFlag,
) -> Result<Vec<String>> {
    match channel.collect_lines(config.banner_window, cancel) {
        Ok(lines) => Ok(lines),
        Err(err) if err.is::<Interrupted>() => Err(err),
        Err(err) => {
            log::warn!("Reading startup banner failed: {err:#}");
            Ok(Vec::new())
        }
    }
}

/// One exchange, classified. Only an interruption escapes as an error.
fn probe<L: SerialLink>(
    channel: &mut LineChannel<L>,
    command: Command,
    config: &DiagnosticConfig,
    cancel: &CancelFlag,
) -> Result<ProbeOutcome> {
    let responses = match channel.exchange(&command, config.window_for(&command), cancel) {
        Ok(lines) => lines,
        Err(err) if err.is::<Interrupted>() => return Err(err),
        Err(err) => {
            log::warn!("{command} exchange failed: {err:#}");
            vec![format!("ERROR: {err:#}")]
        }
    };
    let outcome = ProbeOutcome::classify(&command, responses);
    log::info!(
        "{command}: {} ({} lines)",
        if outcome.passed { "pass" } else { "fail" },
        outcome.responses.len()
    );
    Ok(outcome)
}
