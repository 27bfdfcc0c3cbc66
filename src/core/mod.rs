//! Process-wide plumbing shared by the CLI and the diagnostic runner.
pub mod cancel;

pub use cancel::{CancelFlag, Interrupted};
