use derive_more::{Display, Error};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Raised when the user interrupts a run (Ctrl-C).
///
/// Callers match on it with `anyhow::Error::is::<Interrupted>()` to tell a
/// clean user interruption apart from a real failure.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
#[display("interrupted by user")]
pub struct Interrupted;

/// Shared cancellation flag set by the Ctrl-C handler and polled by every wait.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }

    /// Return `Err(Interrupted)` once the flag has been raised.
    pub fn check(&self) -> anyhow::Result<()> {
        if self.is_cancelled() {
            return Err(Interrupted.into());
        }
        Ok(())
    }

    /// Route Ctrl-C into this flag. Only one handler may be installed per process.
    pub fn install_ctrlc_handler(&self) -> anyhow::Result<()> {
        let flag = self.clone();
        ctrlc::set_handler(move || {
            log::info!("Ctrl-C received, cancelling run");
            flag.cancel();
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_reports_interrupted_after_cancel() {
        let flag = CancelFlag::new();
        assert!(flag.check().is_ok());

        let observer = flag.clone();
        flag.cancel();

        let err = observer.check().unwrap_err();
        assert!(err.is::<Interrupted>());
        assert_eq!(err.to_string(), "interrupted by user");
    }
}
