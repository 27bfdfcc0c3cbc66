use std::process::ExitCode;

use fingerprobe::{boot, cli, core::CancelFlag};

fn main() -> ExitCode {
    let matches = match cli::parse_args() {
        Ok(matches) => matches,
        Err(err) => {
            let _ = err.print();
            // --help and --version are not failures
            return ExitCode::from(if err.use_stderr() { 1 } else { 0 });
        }
    };
    boot::init_common();

    let cancel = CancelFlag::new();
    if let Err(err) = cancel.install_ctrlc_handler() {
        log::warn!("Ctrl-C handler unavailable: {err}");
    }

    ExitCode::from(cli::actions::run(&matches, &cancel))
}
