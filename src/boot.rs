use chrono::Local;
use log::LevelFilter;
use std::io::{self, Write};

use env_logger::{Builder, Target};

/// Environment variable naming a log file; when set, debug logs go there.
pub const LOG_FILE_ENV: &str = "FINGERPROBE_LOG_FILE";

/// Logger and locale setup shared by every entrypoint.
pub fn init_common() {
    if let Ok(path) = std::env::var(LOG_FILE_ENV) {
        if let Err(err) = init_file_logger(&path) {
            eprintln!("Failed to initialize file logger at '{path}': {err}");
            init_stderr_logger();
        }
    } else {
        init_stderr_logger();
    }

    crate::i18n::init_i18n();
}

/// Errors only unless `RUST_LOG` says otherwise; keeps the report readable.
fn init_stderr_logger() {
    let _ = Builder::new()
        .filter_level(LevelFilter::Error)
        .parse_default_env()
        .target(Target::Stderr)
        .try_init();
}

fn init_file_logger(path: &str) -> io::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} {} [{}] - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(file)))
        .filter_level(LevelFilter::Debug)
        .parse_default_env();

    if builder.try_init().is_err() {
        return Err(io::Error::other("a logger is already installed"));
    }

    log::info!("File logger initialized at {path}");
    Ok(())
}
