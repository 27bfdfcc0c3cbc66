use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::Serialize;
use std::io::Write;

use super::{
    config::{self, HardwareMode},
    consent::{PromptStream, StdinConsent},
};
use crate::{
    api::{
        diagnostic::ConnectFailed, open_serial_port, run_diagnostic, Console, DiagnosticConfig,
        FixedConsent, HardwareConsent,
    },
    core::{CancelFlag, Interrupted},
    i18n::lang,
    protocol::{Command, DeviceReply, LineChannel, ScriptedDevice, SerialLink},
    utils::{describe_port, enumerate_ports, sleep::wait_for_board_reset},
};

/// Templates reported by the `--simulate` device.
const SIMULATED_TEMPLATES: u32 = 3;

/// Run whatever the arguments ask for and return the process exit status.
pub fn run(matches: &ArgMatches, cancel: &CancelFlag) -> u8 {
    let json = matches.get_flag("json");
    let result = dispatch(matches, cancel);
    if json {
        exit_code(&result, &mut Console::new(std::io::stderr()))
    } else {
        exit_code(&result, &mut Console::new(std::io::stdout()))
    }
}

fn dispatch(matches: &ArgMatches, cancel: &CancelFlag) -> Result<()> {
    if matches.get_flag("list-ports") {
        return list_ports(matches.get_flag("json"));
    }

    let config = config::resolve(matches)?;
    if let Some(text) = matches.get_one::<String>("send") {
        let command: Command = text.parse()?;
        return send_command(matches, &config, command, cancel);
    }
    diagnose(matches, &config, cancel)
}

/// Map the outcome of a run to the exit status, printing the final notice.
///
/// Interruption is a clean exit. A port that cannot be opened has already
/// been reported by the connection check.
pub fn exit_code<W: Write>(result: &Result<()>, console: &mut Console<W>) -> u8 {
    let err = match result {
        Ok(()) => return 0,
        Err(err) => err,
    };

    if err.is::<Interrupted>() {
        log::info!("Run interrupted by user");
        let _ = console.interrupted().and_then(|_| console.flush());
        0
    } else if err.is::<ConnectFailed>() {
        log::error!("{err:#}");
        1
    } else {
        log::error!("Unexpected error: {err:#}");
        let _ = console.unexpected_error(err).and_then(|_| console.flush());
        1
    }
}

#[derive(Serialize)]
struct PortListing<'a> {
    ports: &'a [crate::protocol::tty::PortEntry],
}

fn list_ports(json: bool) -> Result<()> {
    let ports = enumerate_ports();
    if json {
        println!("{}", serde_json::to_string_pretty(&PortListing { ports: &ports })?);
    } else if ports.is_empty() {
        println!("{}", lang().no_ports);
    } else {
        for entry in &ports {
            println!("{}", describe_port(entry));
        }
    }
    Ok(())
}

fn consent_for(matches: &ArgMatches) -> Box<dyn HardwareConsent> {
    match HardwareMode::from_matches(matches) {
        HardwareMode::Yes => Box::new(FixedConsent(true)),
        HardwareMode::No => Box::new(FixedConsent(false)),
        HardwareMode::Ask => Box::new(prompt_consent(matches)),
    }
}

/// JSON owns stdout, so the question goes to stderr there.
fn prompt_consent(matches: &ArgMatches) -> StdinConsent {
    if matches.get_flag("json") {
        StdinConsent::new(PromptStream::Stderr)
    } else {
        StdinConsent::new(PromptStream::Stdout)
    }
}

fn diagnose(matches: &ArgMatches, config: &DiagnosticConfig, cancel: &CancelFlag) -> Result<()> {
    let json = matches.get_flag("json");
    let mut consent = consent_for(matches);

    if json {
        let mut console = Console::new(std::io::sink());
        let report = if matches.get_flag("simulate") {
            run_diagnostic(config, simulated, consent.as_mut(), cancel, &mut console)?
        } else {
            run_diagnostic(config, open_configured, consent.as_mut(), cancel, &mut console)?
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let mut console = Console::new(std::io::stdout());
        if matches.get_flag("simulate") {
            run_diagnostic(config, simulated, consent.as_mut(), cancel, &mut console)?;
        } else {
            run_diagnostic(config, open_configured, consent.as_mut(), cancel, &mut console)?;
        }
    }
    Ok(())
}

fn open_configured(config: &DiagnosticConfig) -> Result<Box<dyn serialport::SerialPort>> {
    open_serial_port(&config.port_name, config.baud_rate, config.timeout)
}

fn simulated(config: &DiagnosticConfig) -> Result<ScriptedDevice> {
    log::info!("Using simulated device in place of {}", config.port_name);
    Ok(ScriptedDevice::healthy_firmware(config.baud_rate, SIMULATED_TEMPLATES))
}

/// One decoded reply line of `--send`.
#[derive(Debug, Serialize)]
pub struct SentReply {
    pub line: String,
    pub reply: DeviceReply,
}

#[derive(Debug, Serialize)]
struct SendOutcome {
    command: String,
    passed: bool,
    replies: Vec<SentReply>,
}

fn send_command(
    matches: &ArgMatches,
    config: &DiagnosticConfig,
    command: Command,
    cancel: &CancelFlag,
) -> Result<()> {
    let replies = if matches.get_flag("simulate") {
        exchange_once(simulated(config)?, config, &command, cancel)?
    } else {
        let link = open_configured(config).with_context(|| ConnectFailed {
            port: config.port_name.clone(),
        });
        let link = match link {
            Ok(link) => link,
            Err(err) => {
                if !matches.get_flag("json") {
                    let mut console = Console::new(std::io::stdout());
                    console.check(&lang().test_connection, false, Some(&format!("{:#}", err.root_cause())))?;
                }
                return Err(err);
            }
        };
        exchange_once(link, config, &command, cancel)?
    };

    let passed = reply_passed(&command, &replies);
    if matches.get_flag("json") {
        let outcome = SendOutcome {
            command: command.wire(),
            passed,
            replies,
        };
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        let mut console = Console::new(std::io::stdout());
        let detail = replies.is_empty().then(|| lang().send_no_reply.as_str());
        console.check(&command.wire(), passed, detail)?;
        for reply in &replies {
            console.echo(&annotate(reply))?;
        }
        console.flush()?;
    }
    Ok(())
}

/// Send `command` once after the board reset and decode every reply line.
pub fn exchange_once<L: SerialLink>(
    link: L,
    config: &DiagnosticConfig,
    command: &Command,
    cancel: &CancelFlag,
) -> Result<Vec<SentReply>> {
    let mut channel = LineChannel::new(link).with_idle_gap(config.idle_gap);
    wait_for_board_reset(config.reset_delay, cancel)?;
    let lines = channel.exchange(command, config.window_for(command), cancel)?;
    log::info!("{command}: {} reply lines", lines.len());

    Ok(lines
        .into_iter()
        .map(|line| SentReply {
            reply: DeviceReply::parse(&line),
            line,
        })
        .collect())
}

/// Whether the reply carries one of the command's success markers.
pub fn reply_passed(command: &Command, replies: &[SentReply]) -> bool {
    let lines: Vec<String> = replies.iter().map(|r| r.line.clone()).collect();
    command.matches_reply(&lines)
}

fn annotate(reply: &SentReply) -> String {
    match &reply.reply {
        DeviceReply::Error { code, message } if message.is_empty() => {
            format!("{}  [error {code}]", reply.line)
        }
        DeviceReply::Error { code, message } => {
            format!("{}  [error {code}: {message}]", reply.line)
        }
        DeviceReply::Match {
            template_id,
            confidence,
        } => format!("{}  [match #{template_id}, confidence {confidence}]", reply.line),
        _ => reply.line.clone(),
    }
}
