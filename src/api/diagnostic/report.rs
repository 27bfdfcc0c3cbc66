use chrono::{DateTime, Local};
use serde::Serialize;

use crate::protocol::{Command, SensorReading};

/// Checks counted in the summary: connection, PING, STATUS, COUNT, INFO,
/// sensor detected, baud rate in sync. The hardware probe is never counted.
pub const TOTAL_TESTS: u8 = 7;

/// Result of one command/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub command: String,
    pub passed: bool,
    pub responses: Vec<String>,
}

impl ProbeOutcome {
    pub fn classify(command: &Command, responses: Vec<String>) -> Self {
        Self {
            command: command.wire(),
            passed: command.matches_reply(&responses),
            responses,
        }
    }

    /// First reply line, used as the PING detail.
    pub fn first_response(&self) -> Option<&str> {
        self.responses.first().map(|s| s.as_str())
    }

    /// Reply lines containing `needle`.
    pub fn lines_containing<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.responses.iter().filter(move |line| line.contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HardwareOutcome {
    Skipped,
    Ran { probe: ProbeOutcome },
}

/// Summary tier printed under the tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every counted check passed.
    Healthy,
    /// At least five checks passed.
    Degraded,
    Failing,
}

impl Verdict {
    pub fn from_tally(passed: u8) -> Self {
        if passed >= TOTAL_TESTS {
            Verdict::Healthy
        } else if passed >= 5 {
            Verdict::Degraded
        } else {
            Verdict::Failing
        }
    }
}

/// Everything learned during one run; serialised for `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub started_at: DateTime<Local>,
    pub port: String,
    pub baud_rate: u32,
    pub boot_messages: Vec<String>,
    pub ping: ProbeOutcome,
    pub status: ProbeOutcome,
    pub count: ProbeOutcome,
    pub info: ProbeOutcome,
    pub sensor: SensorReading,
    pub baud_synced: bool,
    pub hardware: HardwareOutcome,
    pub passed: u8,
    pub total: u8,
    pub verdict: Verdict,
}

impl DiagnosticReport {
    /// Count passing checks. Reaching this point implies the connection check passed.
    pub fn tally(
        ping: &ProbeOutcome,
        status: &ProbeOutcome,
        count: &ProbeOutcome,
        info: &ProbeOutcome,
        sensor: &SensorReading,
        baud_synced: bool,
    ) -> u8 {
        [
            true,
            ping.passed,
            status.passed,
            count.passed,
            info.passed,
            sensor.detected,
            baud_synced,
        ]
        .iter()
        .filter(|ok| **ok)
        .count() as u8
    }
}
