//! Fingerprobe: serial-link diagnostic for Arduino fingerprint attendance devices
//!
//! The library runs a fixed probe sequence (PING, STATUS, COUNT, INFO and an
//! optional HARDWARE test) against the firmware, scores the answers and renders
//! a console or JSON report. Serial access goes through the
//! [`protocol::SerialLink`] trait so the same runner drives a real port, the
//! `--simulate` device and the test suite.

pub mod api;
#[doc(hidden)]
pub mod boot;
#[doc(hidden)]
pub mod cli;
#[doc(hidden)]
pub mod core;
pub mod i18n;
#[doc(hidden)]
pub mod protocol;
#[doc(hidden)]
pub mod utils;

pub use api::*;
