use anyhow::{anyhow, Result};
use std::{fmt, str::FromStr, time::Duration};
use strum::EnumIter;

/// Highest template slot accepted by the firmware.
pub const MAX_TEMPLATE_ID: u8 = 127;

/// Plain-text commands understood by the attendance firmware.
///
/// Every command travels as one ASCII line terminated by `\n`.
#[derive(EnumIter, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Ping,
    Status,
    Count,
    Info,
    Detect,
    Enroll(u8),
    Verify,
    Delete(u8),
    Empty,
    Hardware,
    BuzzerOn,
    BuzzerOff,
}

impl Command {
    /// Text written to the wire, without the line terminator.
    pub fn wire(&self) -> String {
        match self {
            Command::Ping => "PING".to_string(),
            Command::Status => "STATUS".to_string(),
            Command::Count => "COUNT".to_string(),
            Command::Info => "INFO".to_string(),
            Command::Detect => "DETECT".to_string(),
            Command::Enroll(id) => format!("ENROLL:{id}"),
            Command::Verify => "VERIFY".to_string(),
            Command::Delete(id) => format!("DELETE:{id}"),
            Command::Empty => "EMPTY".to_string(),
            Command::Hardware => "HARDWARE".to_string(),
            Command::BuzzerOn => "BUZZER:ON".to_string(),
            Command::BuzzerOff => "BUZZER:OFF".to_string(),
        }
    }

    /// Usage form shown in the command reference.
    pub fn usage(&self) -> &'static str {
        match self {
            Command::Enroll(_) => "ENROLL:N",
            Command::Delete(_) => "DELETE:N",
            Command::Ping => "PING",
            Command::Status => "STATUS",
            Command::Count => "COUNT",
            Command::Info => "INFO",
            Command::Detect => "DETECT",
            Command::Verify => "VERIFY",
            Command::Empty => "EMPTY",
            Command::Hardware => "HARDWARE",
            Command::BuzzerOn => "BUZZER:ON",
            Command::BuzzerOff => "BUZZER:OFF",
        }
    }

    /// Substrings of which at least one must appear in a reply line for success.
    pub fn success_markers(&self) -> &'static [&'static str] {
        match self {
            Command::Ping => &["PONG"],
            Command::Status => &["STATUS", "CONNECTED"],
            Command::Count => &["TEMPLATES"],
            Command::Info => &["INFO:"],
            Command::Hardware => &["OK"],
            Command::Detect => &["SENSOR"],
            Command::Enroll(_) => &["ENROLL_SUCCESS"],
            Command::Verify => &["VERIFY_SUCCESS"],
            Command::Delete(_) => &["DELETE_SUCCESS"],
            Command::Empty => &["EMPTY"],
            Command::BuzzerOn | Command::BuzzerOff => &["BUZZER"],
        }
    }

    /// Default time to wait for the reply after writing the command.
    pub fn reply_window(&self) -> Duration {
        let ms = match self {
            Command::Ping | Command::Status | Command::Count => 500,
            Command::BuzzerOn | Command::BuzzerOff => 500,
            Command::Info => 1000,
            Command::Detect => 2000,
            Command::Hardware | Command::Delete(_) | Command::Empty => 3000,
            Command::Verify => 15_000,
            Command::Enroll(_) => 30_000,
        };
        Duration::from_millis(ms)
    }

    /// Enrollment and verification print progress lines while the user works
    /// the sensor; the reply is only complete once the outcome line arrives.
    pub fn awaits_outcome(&self) -> bool {
        matches!(self, Command::Enroll(_) | Command::Verify)
    }

    /// A line that settles the command: a success marker or an `ERROR:` report.
    pub fn is_outcome_line(&self, line: &str) -> bool {
        line.starts_with("ERROR:") || self.success_markers().iter().any(|m| line.contains(m))
    }

    /// True when any line contains one of this command's success markers.
    pub fn matches_reply(&self, lines: &[String]) -> bool {
        let markers = self.success_markers();
        lines
            .iter()
            .any(|line| markers.iter().any(|marker| line.contains(marker)))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire())
    }
}

fn parse_template_id(raw: &str, command: &str) -> Result<u8> {
    let id: u8 = raw
        .trim()
        .parse()
        .map_err(|_| anyhow!("{command} expects a numeric template id, got '{raw}'"))?;
    if id == 0 || id > MAX_TEMPLATE_ID {
        return Err(anyhow!(
            "{command} template id must be between 1 and {MAX_TEMPLATE_ID}, got {id}"
        ));
    }
    Ok(id)
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim().to_uppercase();
        let (head, arg) = match text.split_once(':') {
            Some((head, arg)) => (head, Some(arg)),
            None => (text.as_str(), None),
        };

        let command = match (head, arg) {
            ("PING", None) => Command::Ping,
            ("STATUS", None) => Command::Status,
            ("COUNT", None) => Command::Count,
            ("INFO", None) => Command::Info,
            ("DETECT", None) => Command::Detect,
            ("VERIFY", None) => Command::Verify,
            ("EMPTY", None) => Command::Empty,
            ("HARDWARE", None) => Command::Hardware,
            ("ENROLL", Some(id)) => Command::Enroll(parse_template_id(id, "ENROLL")?),
            ("DELETE", Some(id)) => Command::Delete(parse_template_id(id, "DELETE")?),
            ("BUZZER", Some("ON")) => Command::BuzzerOn,
            ("BUZZER", Some("OFF")) => Command::BuzzerOff,
            ("ENROLL", None) | ("DELETE", None) => {
                return Err(anyhow!("{head} requires a template id, e.g. {head}:1"))
            }
            _ => return Err(anyhow!("Unknown device command: '{}'", s.trim())),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse_is_case_insensitive_and_round_trips_wire_text() -> Result<()> {
        assert_eq!("ping".parse::<Command>()?, Command::Ping);
        assert_eq!(" buzzer:off ".parse::<Command>()?, Command::BuzzerOff);

        let enroll: Command = "enroll:42".parse()?;
        assert_eq!(enroll, Command::Enroll(42));
        assert_eq!(enroll.wire(), "ENROLL:42");
        Ok(())
    }

    #[test]
    fn test_template_id_bounds() {
        assert!("ENROLL:0".parse::<Command>().is_err());
        assert!("ENROLL:128".parse::<Command>().is_err());
        assert!("DELETE:abc".parse::<Command>().is_err());
        assert!("DELETE".parse::<Command>().is_err());
        assert_eq!(
            "DELETE:127".parse::<Command>().ok(),
            Some(Command::Delete(MAX_TEMPLATE_ID))
        );
    }

    #[test]
    fn test_unknown_command_rejected() {
        let err = "REBOOT".parse::<Command>().unwrap_err();
        assert!(err.to_string().contains("REBOOT"));
        assert!("PING:1".parse::<Command>().is_err());
    }

    #[test]
    fn test_status_accepts_either_marker() {
        let connected = vec!["SYSTEM CONNECTED".to_string()];
        let status = vec!["STATUS:READY".to_string()];
        let other = vec!["PONG".to_string()];
        assert!(Command::Status.matches_reply(&connected));
        assert!(Command::Status.matches_reply(&status));
        assert!(!Command::Status.matches_reply(&other));
        assert!(!Command::Status.matches_reply(&[]));
    }

    #[test]
    fn test_probe_windows() {
        assert_eq!(Command::Ping.reply_window(), Duration::from_millis(500));
        assert_eq!(Command::Info.reply_window(), Duration::from_secs(1));
        assert_eq!(Command::Hardware.reply_window(), Duration::from_secs(3));
    }

    #[test]
    fn test_outcome_lines_of_multi_step_commands() {
        assert!(Command::Enroll(5).awaits_outcome());
        assert!(Command::Verify.awaits_outcome());
        assert!(!Command::Ping.awaits_outcome());

        let enroll = Command::Enroll(5);
        assert!(!enroll.is_outcome_line("STATUS:ENROLL_START:5"));
        assert!(enroll.is_outcome_line("STATUS:ENROLL_SUCCESS:5"));
        assert!(enroll.is_outcome_line("ERROR:TIMEOUT:No finger"));
        assert!(Command::Verify.is_outcome_line("VERIFY_SUCCESS:3:87"));
        assert!(!Command::Verify.is_outcome_line("STATUS:VERIFY_START"));
    }

    #[test]
    fn test_reference_lists_every_command_once() {
        let usages: Vec<&str> = Command::iter().map(|c| c.usage()).collect();
        assert_eq!(usages.len(), 12);
        assert!(usages.contains(&"ENROLL:N"));
        assert!(usages.contains(&"BUZZER:OFF"));
    }
}
