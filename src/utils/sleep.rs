//! Sleep utilities

use anyhow::Result;
use std::time::{Duration, Instant};

use crate::core::CancelFlag;

/// Longest single nap between cancellation checks.
const SLICE: Duration = Duration::from_millis(50);

/// Sleep for `duration`, waking up every 50ms to honour Ctrl-C.
pub fn sleep_cancellable(duration: Duration, cancel: &CancelFlag) -> Result<()> {
    let deadline = Instant::now() + duration;
    loop {
        cancel.check()?;
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        std::thread::sleep((deadline - now).min(SLICE));
    }
}

/// Arduino boards reset when the port is opened; 2 seconds covers the bootloader.
pub fn wait_for_board_reset(duration: Duration, cancel: &CancelFlag) -> Result<()> {
    log::debug!("Waiting {}ms for board reset", duration.as_millis());
    sleep_cancellable(duration, cancel)
}
