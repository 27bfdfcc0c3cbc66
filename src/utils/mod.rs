//! Shared utilities
//!
//! - Serial port listing
//! - Cancellable sleeps

pub mod ports;
pub mod sleep;

pub use ports::*;
pub use sleep::*;
