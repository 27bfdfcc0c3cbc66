pub mod diagnostic;
pub mod utils;

pub use diagnostic::{
    run_diagnostic, Console, DiagnosticConfig, DiagnosticReport, FixedConsent, HardwareConsent,
    Verdict,
};
pub use utils::open_serial_port;
