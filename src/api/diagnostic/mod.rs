pub mod render;
pub mod report;
pub mod runner;
pub mod traits;

use derive_more::{Display, Error};
use std::time::Duration;

use crate::protocol::{link::DEFAULT_IDLE_GAP, Command};

pub use render::Console;
pub use report::{DiagnosticReport, HardwareOutcome, ProbeOutcome, Verdict, TOTAL_TESTS};
pub use runner::run_diagnostic;
pub use traits::{FixedConsent, HardwareConsent};

#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM3";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Baud rate the attendance firmware and its DY50 sensor run at.
pub const DEFAULT_BAUD_RATE: u32 = 57600;

/// Raised when the serial port cannot be opened. Nothing else runs after it.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("failed to open serial port {port}")]
pub struct ConnectFailed {
    #[error(not(source))]
    pub port: String,
}

/// Settings of one diagnostic run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticConfig {
    pub port_name: String,
    pub baud_rate: u32,
    /// Read timeout handed to the serial driver.
    pub timeout: Duration,
    /// Pause after opening the port while the board resets.
    pub reset_delay: Duration,
    /// How long to collect the startup banner.
    pub banner_window: Duration,
    /// Silence after the first reply byte that ends a reply early.
    pub idle_gap: Duration,
    /// Replaces every command's default reply window when set.
    pub reply_window: Option<Duration>,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            port_name: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_secs(5),
            reset_delay: Duration::from_secs(2),
            banner_window: Duration::from_secs(1),
            idle_gap: DEFAULT_IDLE_GAP,
            reply_window: None,
        }
    }
}

impl DiagnosticConfig {
    pub fn with_port(mut self, port_name: &str) -> Self {
        self.port_name = port_name.to_string();
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_reset_delay(mut self, reset_delay: Duration) -> Self {
        self.reset_delay = reset_delay;
        self
    }

    pub fn with_banner_window(mut self, banner_window: Duration) -> Self {
        self.banner_window = banner_window;
        self
    }

    pub fn with_idle_gap(mut self, idle_gap: Duration) -> Self {
        self.idle_gap = idle_gap;
        self
    }

    /// Use the same reply window for every command (tests, slow links).
    pub fn with_reply_window(mut self, window: Duration) -> Self {
        self.reply_window = Some(window);
        self
    }

    pub fn window_for(&self, command: &Command) -> Duration {
        self.reply_window.unwrap_or_else(|| command.reply_window())
    }
}
