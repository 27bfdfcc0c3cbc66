use anyhow::{anyhow, Result};
use std::time::Duration;

use fingerprobe::{
    api::diagnostic::{ConnectFailed, HardwareOutcome, TOTAL_TESTS},
    cli::actions::exit_code,
    core::{CancelFlag, Interrupted},
    i18n::lang,
    protocol::ScriptedDevice,
    run_diagnostic, Console, DiagnosticConfig, DiagnosticReport, FixedConsent, Verdict,
};

fn fast_config() -> DiagnosticConfig {
    DiagnosticConfig::default()
        .with_port("SIM0")
        .with_reset_delay(Duration::ZERO)
        .with_banner_window(Duration::from_millis(40))
        .with_idle_gap(Duration::from_millis(10))
        .with_reply_window(Duration::from_millis(40))
}

fn diagnose(device: &ScriptedDevice, hardware: bool) -> Result<(DiagnosticReport, String)> {
    let mut console = Console::new(Vec::new());
    let link = device.clone();
    let report = run_diagnostic(
        &fast_config(),
        move |_| Ok(link),
        &mut FixedConsent(hardware),
        &CancelFlag::new(),
        &mut console,
    )?;
    let out = String::from_utf8_lossy(&console.into_inner()).to_string();
    Ok((report, out))
}

#[test]
fn test_ping_passes_on_pong() -> Result<()> {
    let device = ScriptedDevice::new().respond("PING", &["PONG"]);
    let (report, out) = diagnose(&device, false)?;

    assert!(report.ping.passed);
    assert_eq!(report.ping.responses, vec!["PONG"]);
    assert!(out.contains("(PONG)"));
    Ok(())
}

#[test]
fn test_silent_device_scores_one_and_fails() -> Result<()> {
    let device = ScriptedDevice::new();
    let (report, out) = diagnose(&device, false)?;

    assert_eq!(report.passed, 1);
    assert_eq!(report.verdict, Verdict::Failing);
    assert!(report.boot_messages.is_empty());
    assert!(out.contains(&format!("1/{TOTAL_TESTS}")));
    assert!(out.contains(lang().verdict_failing.as_str()));
    assert!(out.contains("SIM0"));
    Ok(())
}

#[test]
fn test_sensor_facts_parsed_from_info() -> Result<()> {
    let device = ScriptedDevice::new().respond(
        "INFO",
        &["INFO:DY50", "SENSOR_BAUD:57600", "TEMPLATES:12"],
    );
    let (report, _) = diagnose(&device, false)?;

    assert!(report.info.passed);
    assert!(report.sensor.detected);
    assert_eq!(report.sensor.baud, 57600);
    assert_eq!(report.sensor.templates, 12);
    assert!(report.baud_synced);
    Ok(())
}

#[test]
fn test_unparseable_template_count_is_zero() -> Result<()> {
    let device = ScriptedDevice::new().respond("INFO", &["INFO:DY50", "TEMPLATES:abc"]);
    let (report, _) = diagnose(&device, false)?;

    assert_eq!(report.sensor.templates, 0);
    assert!(!report.sensor.detected);
    Ok(())
}

#[test]
fn test_sensor_at_other_speed_is_out_of_sync() -> Result<()> {
    let device = ScriptedDevice::healthy_firmware(9600, 4);
    let (report, _) = diagnose(&device, false)?;

    assert!(report.sensor.detected);
    assert!(!report.baud_synced);
    assert_eq!(report.passed, TOTAL_TESTS - 1);
    assert_eq!(report.verdict, Verdict::Degraded);
    Ok(())
}

#[test]
fn test_hardware_probe_is_not_counted() -> Result<()> {
    let failing_hardware = ScriptedDevice::healthy_firmware(57600, 2).respond("HARDWARE", &["LED:GREEN"]);
    let (with_hw, out) = diagnose(&failing_hardware, true)?;
    let (without_hw, _) = diagnose(&ScriptedDevice::healthy_firmware(57600, 2), false)?;

    assert!(matches!(with_hw.hardware, HardwareOutcome::Ran { ref probe } if !probe.passed));
    assert_eq!(without_hw.hardware, HardwareOutcome::Skipped);
    assert_eq!(with_hw.passed, TOTAL_TESTS);
    assert_eq!(without_hw.passed, TOTAL_TESTS);
    assert!(with_hw.passed <= with_hw.total);
    assert!(out.contains("LED:GREEN"));
    Ok(())
}

#[test]
fn test_declined_hardware_sends_nothing_extra() -> Result<()> {
    let device = ScriptedDevice::healthy_firmware(57600, 0);
    let (_, out) = diagnose(&device, false)?;

    assert_eq!(device.sent(), vec!["PING", "STATUS", "COUNT", "INFO"]);
    assert!(out.contains(lang().hardware_skipped.as_str()));
    assert!(out.trim_end().ends_with(lang().port_closed.as_str()));
    Ok(())
}

#[test]
fn test_open_failure_exits_one_without_probes() {
    let mut console = Console::new(Vec::new());
    let result = run_diagnostic::<ScriptedDevice, _, _>(
        &fast_config(),
        |_| Err(anyhow!("Permission denied")),
        &mut FixedConsent(true),
        &CancelFlag::new(),
        &mut console,
    );

    let err = result.as_ref().map(|_| ()).unwrap_err();
    assert!(err.is::<ConnectFailed>());
    assert_eq!(exit_code(&result.map(|_| ()), &mut console), 1);

    let out = String::from_utf8_lossy(&console.into_inner()).to_string();
    assert!(out.contains("Permission denied"));
    assert!(!out.contains("PING"));
    assert!(!out.contains(lang().summary_title.as_str()));
}

#[test]
fn test_interrupt_exits_zero_with_notice() {
    let cancel = CancelFlag::new();
    let device = ScriptedDevice::healthy_firmware(57600, 5).interrupt_after(2, &cancel);
    let mut console = Console::new(Vec::new());

    let result = run_diagnostic(
        &fast_config(),
        |_| Ok(device.clone()),
        &mut FixedConsent(true),
        &cancel,
        &mut console,
    )
    .map(|_| ());

    assert!(result.as_ref().unwrap_err().is::<Interrupted>());
    assert_eq!(exit_code(&result, &mut console), 0);

    let out = String::from_utf8_lossy(&console.into_inner()).to_string();
    assert!(out.contains(lang().interrupted.as_str()));
    assert!(!out.contains(lang().summary_title.as_str()));
    assert_eq!(device.sent(), vec!["PING", "STATUS"]);
}
