//! In-process stand-in for the attendance firmware.
//!
//! `ScriptedDevice` replies to whole command lines from a fixed script. It
//! backs the `--simulate` switch and the test-suite.

use parking_lot::Mutex;
use std::{
    collections::{HashMap, VecDeque},
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use super::link::SerialLink;
use crate::core::CancelFlag;

#[derive(Default)]
struct DeviceState {
    /// Bytes waiting to be read by the host.
    outbound: VecDeque<u8>,
    /// Partial command line written by the host.
    inbound: Vec<u8>,
    replies: HashMap<String, Vec<u8>>,
    /// Follow-up replies sent some time after the command.
    late_replies: HashMap<String, Vec<(Duration, Vec<u8>)>>,
    /// Follow-ups already triggered, with the time they become readable.
    scheduled: Vec<(Instant, Vec<u8>)>,
    sent: Vec<String>,
    io_failure: Option<String>,
    interrupt: Option<(usize, CancelFlag)>,
    answer_unknown: bool,
}

impl DeviceState {
    fn release_due(&mut self) {
        let now = Instant::now();
        let (due, later): (Vec<_>, Vec<_>) = self
            .scheduled
            .drain(..)
            .partition(|(at, _)| *at <= now);
        self.scheduled = later;
        for (_, bytes) in due {
            self.outbound.extend(bytes);
        }
    }

    fn on_line(&mut self, line: String) {
        log::debug!("simulated device received '{line}'");
        self.sent.push(line.clone());

        match self.replies.get(&line) {
            Some(reply) => self.outbound.extend(reply.iter().copied()),
            None if self.answer_unknown => self
                .outbound
                .extend(format!("ERROR:UNKNOWN_COMMAND:{line}\n").bytes()),
            None => {}
        }
        if let Some(late) = self.late_replies.get(&line) {
            let now = Instant::now();
            for (delay, bytes) in late {
                self.scheduled.push((now + *delay, bytes.clone()));
            }
        }

        if let Some((after, flag)) = &self.interrupt {
            if self.sent.len() >= *after {
                flag.cancel();
            }
        }
    }
}

/// Scripted device shared between the link and the test that inspects it.
#[derive(Clone, Default)]
pub struct ScriptedDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl ScriptedDevice {
    /// A device that says nothing unless scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that answers like healthy firmware with a DY50 sensor at `sensor_baud`.
    pub fn healthy_firmware(sensor_baud: u32, templates: u32) -> Self {
        let templates_line = format!("TEMPLATES:{templates}");
        let baud_line = format!("SENSOR_BAUD:{sensor_baud}");
        let count_line = format!("STATUS:TEMPLATES:{templates}");
        Self::new()
            .banner(&["FIRMWARE:v4.2", "SENSOR:DY50 OK", "READY"])
            .respond("PING", &["PONG"])
            .respond("STATUS", &["STATUS:CONNECTED", "SENSOR:OK"])
            .respond("COUNT", &[count_line.as_str()])
            .respond(
                "INFO",
                &["INFO:DY50", baud_line.as_str(), templates_line.as_str(), "CAPACITY:127"],
            )
            .respond("DETECT", &["SENSOR:DETECTED"])
            .respond(
                "HARDWARE",
                &["LED:GREEN", "LED:RED", "BUZZER:BEEP", "HARDWARE:OK"],
            )
            .respond("BUZZER:ON", &["BUZZER:ON"])
            .respond("BUZZER:OFF", &["BUZZER:OFF"])
            .respond("EMPTY", &["STATUS:EMPTY_SUCCESS"])
            .respond("VERIFY", &["STATUS:VERIFY_START", "ERROR:NOT_FOUND:No match"])
            .answer_unknown_commands()
    }

    /// Queue lines as if printed by the board right after reset.
    pub fn banner(self, lines: &[&str]) -> Self {
        {
            let mut state = self.state.lock();
            for line in lines {
                state.outbound.extend(line.bytes());
                state.outbound.push_back(b'\n');
            }
        }
        self
    }

    /// Reply with `lines` whenever the host writes `command`.
    pub fn respond(self, command: &str, lines: &[&str]) -> Self {
        let mut raw = Vec::new();
        for line in lines {
            raw.extend_from_slice(line.as_bytes());
            raw.push(b'\n');
        }
        self.respond_raw(command, &raw)
    }

    /// Also reply with `lines`, `delay` after the host writes `command`.
    pub fn respond_after(self, command: &str, delay: Duration, lines: &[&str]) -> Self {
        let mut raw = Vec::new();
        for line in lines {
            raw.extend_from_slice(line.as_bytes());
            raw.push(b'\n');
        }
        self.state
            .lock()
            .late_replies
            .entry(command.to_string())
            .or_default()
            .push((delay, raw));
        self
    }

    /// Reply with exact bytes, terminators included.
    pub fn respond_raw(self, command: &str, bytes: &[u8]) -> Self {
        self.state
            .lock()
            .replies
            .insert(command.to_string(), bytes.to_vec());
        self
    }

    /// Reply `ERROR:UNKNOWN_COMMAND:<line>` to anything not scripted.
    pub fn answer_unknown_commands(self) -> Self {
        self.state.lock().answer_unknown = true;
        self
    }

    /// Make every write and buffer clear fail with `message`.
    pub fn fail_io(self, message: &str) -> Self {
        self.state.lock().io_failure = Some(message.to_string());
        self
    }

    /// Raise `flag` once `count` command lines have been received.
    pub fn interrupt_after(self, count: usize, flag: &CancelFlag) -> Self {
        self.state.lock().interrupt = Some((count, flag.clone()));
        self
    }

    /// Command lines received so far, in order.
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }

    fn check_failure(state: &DeviceState) -> io::Result<()> {
        match &state.io_failure {
            Some(message) => Err(io::Error::other(message.clone())),
            None => Ok(()),
        }
    }
}

impl SerialLink for ScriptedDevice {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        Self::check_failure(&state)?;

        state.inbound.extend_from_slice(bytes);
        while let Some(pos) = state.inbound.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = state.inbound.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                state.on_line(line);
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Self::check_failure(&self.state.lock())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let mut state = self.state.lock();
        state.release_due();
        Ok(state.outbound.len())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        state.release_due();
        let n = buf.len().min(state.outbound.len());
        for (slot, byte) in buf.iter_mut().zip(state.outbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn discard_buffers(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        Self::check_failure(&state)?;
        state.outbound.clear();
        state.inbound.clear();
        Ok(())
    }
}
