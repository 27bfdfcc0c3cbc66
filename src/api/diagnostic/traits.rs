//! Injection points of the diagnostic runner.
//!
//! The runner never touches the console input directly; whoever drives it
//! decides how the optional hardware test gets approved.

use anyhow::Result;

use crate::core::CancelFlag;

/// Decides whether the optional HARDWARE probe (LEDs and buzzer) runs.
pub trait HardwareConsent {
    /// Return `Ok(true)` to run the hardware probe.
    ///
    /// Implementations that block must poll `cancel` and return
    /// `Err(Interrupted)` once it is raised.
    fn confirm(&mut self, prompt: &str, cancel: &CancelFlag) -> Result<bool>;
}

/// Answer fixed ahead of time, from `--hardware yes|no` or a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedConsent(pub bool);

impl HardwareConsent for FixedConsent {
    fn confirm(&mut self, prompt: &str, cancel: &CancelFlag) -> Result<bool> {
        cancel.check()?;
        log::debug!("Hardware consent preset to {} for prompt '{}'", self.0, prompt.trim());
        Ok(self.0)
    }
}
