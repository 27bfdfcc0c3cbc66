use anyhow::{anyhow, Result};
use std::{
    io::{self, BufRead, Write},
    time::Duration,
};

use crate::{api::HardwareConsent, core::CancelFlag};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Where the question is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptStream {
    #[default]
    Stdout,
    Stderr,
}

/// Asks on the terminal. The blocking read happens on a helper thread so
/// Ctrl-C still ends the run while the prompt waits.
#[derive(Debug, Default)]
pub struct StdinConsent {
    stream: PromptStream,
}

impl StdinConsent {
    pub fn new(stream: PromptStream) -> Self {
        Self { stream }
    }

    pub fn stream(&self) -> PromptStream {
        self.stream
    }

    fn show(&self, prompt: &str) -> io::Result<()> {
        match self.stream {
            PromptStream::Stdout => {
                let mut out = io::stdout();
                write!(out, "{prompt}")?;
                out.flush()
            }
            PromptStream::Stderr => {
                let mut out = io::stderr();
                write!(out, "{prompt}")?;
                out.flush()
            }
        }
    }
}

impl HardwareConsent for StdinConsent {
    fn confirm(&mut self, prompt: &str, cancel: &CancelFlag) -> Result<bool> {
        cancel.check()?;
        self.show(prompt)?;

        let (tx, rx) = flume::bounded(1);
        std::thread::spawn(move || {
            let mut answer = String::new();
            let read = io::stdin().lock().read_line(&mut answer).map(|_| answer);
            let _ = tx.send(read);
        });

        await_answer(&rx, cancel)
    }
}

/// Wait for the reader thread's line, checking `cancel` between polls.
/// A reader that hangs up without an answer counts as a refusal.
pub fn await_answer(
    answers: &flume::Receiver<io::Result<String>>,
    cancel: &CancelFlag,
) -> Result<bool> {
    loop {
        cancel.check()?;
        match answers.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(answer)) => {
                log::debug!("Hardware prompt answered with '{}'", answer.trim());
                return Ok(is_affirmative(&answer));
            }
            Ok(Err(err)) => return Err(anyhow!("Failed to read answer: {err}")),
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => return Ok(false),
        }
    }
}

/// Yes in English or Spanish (`y`, `yes`, `s`, `si`, `sí`), any case.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "s" | "si" | "sí" | "y" | "yes"
    )
}
