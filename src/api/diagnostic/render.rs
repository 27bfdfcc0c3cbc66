use anyhow::Result;
use crossterm::style::Stylize;
use std::io::Write;
use strum::IntoEnumIterator;

use super::report::{DiagnosticReport, ProbeOutcome, Verdict, TOTAL_TESTS};
use crate::{
    i18n::{fill, lang},
    protocol::Command,
};

const RULE_WIDTH: usize = 60;

/// Console report writer. Wraps stdout in the binary and a buffer in tests.
pub struct Console<W: Write> {
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn blank(&mut self) -> Result<()> {
        writeln!(self.out)?;
        Ok(())
    }

    pub fn header(&mut self, port: &str, baud_rate: u32) -> Result<()> {
        let l = lang();
        writeln!(self.out, "\n{}", "=".repeat(RULE_WIDTH))?;
        writeln!(self.out, "  {}", l.header_title)?;
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(self.out, "{}: {port}", l.label_port)?;
        writeln!(self.out, "{}: {baud_rate}", l.label_baud)?;
        writeln!(self.out, "{}\n", "=".repeat(RULE_WIDTH))?;
        Ok(())
    }

    pub fn phase(&mut self, title: &str) -> Result<()> {
        writeln!(self.out, "{title}")?;
        writeln!(self.out, "{}", "-".repeat(RULE_WIDTH))?;
        Ok(())
    }

    /// `[✓] name (detail)` in green, or `[✗] ...` in red.
    pub fn check(&mut self, name: &str, passed: bool, detail: Option<&str>) -> Result<()> {
        let mark = if passed {
            "[✓]".green()
        } else {
            "[✗]".red()
        };
        match detail {
            Some(detail) if !detail.is_empty() => {
                writeln!(self.out, "{mark} {name:40} ({detail})")?
            }
            _ => writeln!(self.out, "{mark} {name:40}")?,
        }
        Ok(())
    }

    /// Indented echo of a device line.
    pub fn echo(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "    → {line}")?;
        Ok(())
    }

    pub fn echo_all<'a>(&mut self, lines: impl IntoIterator<Item = &'a String>) -> Result<()> {
        for line in lines {
            self.echo(line)?;
        }
        Ok(())
    }

    /// Echo at most the last `keep` lines.
    pub fn echo_tail(&mut self, lines: &[String], keep: usize) -> Result<()> {
        let start = lines.len().saturating_sub(keep);
        self.echo_all(&lines[start..])
    }

    pub fn boot_messages(&mut self, lines: &[String]) -> Result<()> {
        let l = lang();
        if lines.is_empty() {
            self.check(&l.test_boot_messages, false, Some(&l.detail_no_response))
        } else {
            let detail = fill(&l.detail_lines, &[("count", &lines.len())]);
            self.check(&l.test_boot_messages, true, Some(&detail))?;
            self.echo_tail(lines, 5)
        }
    }

    pub fn ping(&mut self, probe: &ProbeOutcome) -> Result<()> {
        let detail = probe
            .first_response()
            .unwrap_or(lang().detail_no_response.as_str());
        self.check("PING", probe.passed, Some(detail))
    }

    pub fn status(&mut self, probe: &ProbeOutcome) -> Result<()> {
        self.check("STATUS", probe.passed, None)?;
        self.echo_all(&probe.responses)
    }

    pub fn count(&mut self, probe: &ProbeOutcome) -> Result<()> {
        self.check("COUNT", probe.passed, None)?;
        if probe.passed {
            self.echo_all(probe.lines_containing("TEMPLATES"))?;
        }
        Ok(())
    }

    pub fn info(&mut self, probe: &ProbeOutcome) -> Result<()> {
        self.check("INFO", probe.passed, None)?;
        if probe.passed {
            self.echo_all(probe.lines_containing("INFO:"))?;
        }
        Ok(())
    }

    pub fn hardware(&mut self, probe: &ProbeOutcome) -> Result<()> {
        self.check(&lang().test_hardware, probe.passed, None)?;
        self.echo_tail(&probe.responses, 10)
    }

    pub fn hardware_skipped(&mut self) -> Result<()> {
        writeln!(self.out, "    {}", lang().hardware_skipped)?;
        Ok(())
    }

    pub fn sensor(&mut self, report: &DiagnosticReport) -> Result<()> {
        let l = lang();
        let sensor = &report.sensor;
        let detail = if sensor.detected {
            fill(&l.detail_sensor_at, &[("baud", &sensor.baud)])
        } else {
            l.detail_sensor_missing.clone()
        };
        self.check(&l.test_sensor_detected, sensor.detected, Some(&detail))?;

        let templates = fill(&l.detail_templates, &[("count", &sensor.templates)]);
        self.check(&l.test_templates, true, Some(&templates))?;

        let sync = fill(
            &l.detail_baud_sync,
            &[("sensor", &sensor.baud), ("host", &report.baud_rate)],
        );
        self.check(&l.test_baud_sync, report.baud_synced, Some(&sync))
    }

    pub fn summary(&mut self, report: &DiagnosticReport) -> Result<()> {
        let l = lang();
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(self.out, "{}", l.summary_title)?;
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(
            self.out,
            "\n{}: {}/{}",
            l.summary_passed, report.passed, TOTAL_TESTS
        )?;

        match report.verdict {
            Verdict::Healthy => {
                writeln!(self.out, "\n✅ {}", l.verdict_healthy.as_str().green())?;
                writeln!(self.out, "\n{}\n", l.verdict_healthy_hint)?;
            }
            Verdict::Degraded => {
                writeln!(self.out, "\n⚠️  {}", l.verdict_degraded.as_str().yellow())?;
                writeln!(self.out, "\n{}\n", l.verdict_degraded_hint)?;
            }
            Verdict::Failing => {
                writeln!(self.out, "\n❌ {}", l.verdict_failing.as_str().red())?;
                writeln!(self.out, "\n{}\n", l.verdict_failing_hint)?;
                writeln!(self.out, "1. {}", l.check_firmware)?;
                writeln!(
                    self.out,
                    "2. {}",
                    fill(&l.check_baud, &[("baud", &report.baud_rate)])
                )?;
                writeln!(self.out, "3. {}", l.check_wiring)?;
                writeln!(
                    self.out,
                    "4. {}\n",
                    fill(&l.check_port, &[("port", &report.port)])
                )?;
            }
        }
        Ok(())
    }

    /// Reference of every command the firmware accepts.
    pub fn command_reference(&mut self) -> Result<()> {
        let l = lang();
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(self.out, "{}", l.commands_title)?;
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))?;
        for command in Command::iter() {
            writeln!(self.out, "{:<12} - {}", command.usage(), describe(&command))?;
        }
        writeln!(self.out, "{}\n", "=".repeat(RULE_WIDTH))?;
        Ok(())
    }

    pub fn port_closed(&mut self) -> Result<()> {
        writeln!(self.out, "{}\n", lang().port_closed)?;
        Ok(())
    }

    pub fn interrupted(&mut self) -> Result<()> {
        writeln!(self.out, "\n\n{}\n", lang().interrupted)?;
        Ok(())
    }

    pub fn unexpected_error(&mut self, err: &anyhow::Error) -> Result<()> {
        writeln!(self.out, "\n❌ {}: {err:#}\n", lang().unexpected_error)?;
        Ok(())
    }
}

fn describe(command: &Command) -> &'static str {
    let l = lang();
    match command {
        Command::Ping => l.cmd_ping.as_str(),
        Command::Status => l.cmd_status.as_str(),
        Command::Count => l.cmd_count.as_str(),
        Command::Info => l.cmd_info.as_str(),
        Command::Detect => l.cmd_detect.as_str(),
        Command::Enroll(_) => l.cmd_enroll.as_str(),
        Command::Verify => l.cmd_verify.as_str(),
        Command::Delete(_) => l.cmd_delete.as_str(),
        Command::Empty => l.cmd_empty.as_str(),
        Command::Hardware => l.cmd_hardware.as_str(),
        Command::BuzzerOn => l.cmd_buzzer_on.as_str(),
        Command::BuzzerOff => l.cmd_buzzer_off.as_str(),
    }
}
