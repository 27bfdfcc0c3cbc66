use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

use crate::api::diagnostic::DiagnosticConfig;

/// Optional settings file; every key may be omitted.
///
/// ```toml
/// port_name = "COM3"
/// baud_rate = 57600
/// timeout_ms = 5000
/// reset_delay_ms = 2000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub port_name: Option<String>,
    pub baud_rate: Option<u32>,
    /// Serial read timeout (milliseconds)
    pub timeout_ms: Option<u64>,
    /// Board reset wait after opening the port (milliseconds)
    pub reset_delay_ms: Option<u64>,
    /// Startup banner collection window (milliseconds)
    pub banner_window_ms: Option<u64>,
    /// Reply idle gap (milliseconds)
    pub idle_gap_ms: Option<u64>,
    /// Same reply window for every command (milliseconds)
    pub reply_window_ms: Option<u64>,
}

impl FileConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| anyhow!("Invalid configuration: {e}"))
    }

    /// Read configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("In config file {}", path.display()))
    }

    /// Overlay the file's values on `base`.
    pub fn apply(&self, mut base: DiagnosticConfig) -> DiagnosticConfig {
        if let Some(port) = &self.port_name {
            base.port_name = port.clone();
        }
        if let Some(baud) = self.baud_rate {
            base.baud_rate = baud;
        }
        if let Some(ms) = self.timeout_ms {
            base.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.reset_delay_ms {
            base.reset_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.banner_window_ms {
            base.banner_window = Duration::from_millis(ms);
        }
        if let Some(ms) = self.idle_gap_ms {
            base.idle_gap = Duration::from_millis(ms);
        }
        if let Some(ms) = self.reply_window_ms {
            base.reply_window = Some(Duration::from_millis(ms));
        }
        base
    }
}

/// What to do about the optional hardware probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareMode {
    Ask,
    Yes,
    No,
}

impl HardwareMode {
    /// `--hardware` value; JSON output never prompts unless asked to.
    pub fn from_matches(matches: &ArgMatches) -> Self {
        match matches.get_one::<String>("hardware").map(String::as_str) {
            Some("yes") => HardwareMode::Yes,
            Some("no") => HardwareMode::No,
            Some(_) => HardwareMode::Ask,
            None if matches.get_flag("json") => HardwareMode::No,
            None => HardwareMode::Ask,
        }
    }
}

/// Defaults, then `--config` file, then explicit flags.
pub fn resolve(matches: &ArgMatches) -> Result<DiagnosticConfig> {
    let mut config = DiagnosticConfig::default();

    if let Some(path) = matches.get_one::<String>("config") {
        config = FileConfig::from_file(Path::new(path))?.apply(config);
    }
    if let Some(port) = matches.get_one::<String>("port") {
        config.port_name = port.clone();
    }
    if let Some(baud) = matches.get_one::<u32>("baud-rate") {
        config.baud_rate = *baud;
    }
    if let Some(ms) = matches.get_one::<u64>("timeout") {
        config.timeout = Duration::from_millis(*ms);
    }

    log::debug!("Resolved configuration: {config:?}");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::command;

    #[test]
    fn test_file_overrides_defaults_and_flags_override_file() -> Result<()> {
        let path = std::env::temp_dir().join(format!("fingerprobe-test-{}.toml", std::process::id()));
        std::fs::write(&path, "port_name = \"COM7\"\nbaud_rate = 9600\nreset_delay_ms = 0\n")?;

        let matches = command().try_get_matches_from([
            "fingerprobe",
            "--config",
            path.to_str().unwrap_or_default(),
            "--baud-rate",
            "115200",
        ])?;
        let config = resolve(&matches)?;
        std::fs::remove_file(&path)?;

        assert_eq!(config.port_name, "COM7");
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.reset_delay, Duration::ZERO);
        assert_eq!(config.timeout, Duration::from_secs(5));
        Ok(())
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = FileConfig::from_toml("port = \"COM1\"").unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn test_missing_config_file_names_path() {
        let err = FileConfig::from_file(Path::new("/nonexistent/fingerprobe.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/fingerprobe.toml"));
    }

    #[test]
    fn test_hardware_mode_defaults() -> Result<()> {
        let plain = command().try_get_matches_from(["fingerprobe"])?;
        assert_eq!(HardwareMode::from_matches(&plain), HardwareMode::Ask);

        let json = command().try_get_matches_from(["fingerprobe", "--json"])?;
        assert_eq!(HardwareMode::from_matches(&json), HardwareMode::No);

        let forced = command().try_get_matches_from(["fingerprobe", "--json", "--hardware", "yes"])?;
        assert_eq!(HardwareMode::from_matches(&forced), HardwareMode::Yes);
        Ok(())
    }
}
