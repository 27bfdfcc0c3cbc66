use anyhow::{Context, Result};
use std::{
    io::{self, Read, Write},
    time::{Duration, Instant},
};

use super::command::Command;
use crate::{core::CancelFlag, utils::sleep::sleep_cancellable};

/// Interval between `bytes_available` polls while collecting a reply.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default silence after the first reply byte that ends a collection early.
pub const DEFAULT_IDLE_GAP: Duration = Duration::from_millis(150);

/// Unterminated input longer than this is cut into a line of its own.
pub const MAX_LINE_LEN: usize = 1024;

/// Byte-level access to the device.
///
/// Implemented for real serial ports and for the in-process simulated device,
/// so the probe logic never knows which one it is talking to.
pub trait SerialLink: Send {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Number of bytes that can be read without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Drop anything pending in the input and output buffers.
    fn discard_buffers(&mut self) -> io::Result<()>;
}

impl SerialLink for Box<dyn serialport::SerialPort> {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        Write::write_all(self, bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(self)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }

    fn discard_buffers(&mut self) -> io::Result<()> {
        self.clear(serialport::ClearBuffer::All)?;
        Ok(())
    }
}

/// Newline framing on top of a [`SerialLink`].
///
/// The channel owns the link; dropping the channel releases the port.
pub struct LineChannel<L: SerialLink> {
    link: L,
    idle_gap: Duration,
}

impl<L: SerialLink> LineChannel<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            idle_gap: DEFAULT_IDLE_GAP,
        }
    }

    pub fn with_idle_gap(mut self, idle_gap: Duration) -> Self {
        self.idle_gap = idle_gap;
        self
    }

    /// Write `text` followed by `\n` and flush.
    pub fn send_line(&mut self, text: &str) -> Result<()> {
        log::debug!("-> {text}");
        let framed = format!("{text}\n");
        self.link
            .write_all(framed.as_bytes())
            .context("failed to write command")?;
        self.link
            .flush()
            .context("failed to flush command")?;
        Ok(())
    }

    /// Read lines until `window` elapses, or until the device has gone quiet
    /// for the idle gap after sending at least one byte.
    ///
    /// Lines are decoded lossily, trimmed, and empty lines are dropped. A
    /// trailing fragment without a terminator is returned as the last line.
    pub fn collect_lines(&mut self, window: Duration, cancel: &CancelFlag) -> Result<Vec<String>> {
        self.collect(window, cancel, None)
    }

    /// Read lines until one satisfies `done` or `window` elapses. Pauses in
    /// the output do not end the collection.
    pub fn collect_until(
        &mut self,
        window: Duration,
        cancel: &CancelFlag,
        done: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<String>> {
        self.collect(window, cancel, Some(done))
    }

    fn collect(
        &mut self,
        window: Duration,
        cancel: &CancelFlag,
        done: Option<&dyn Fn(&str) -> bool>,
    ) -> Result<Vec<String>> {
        let deadline = Instant::now() + window;
        let mut pending: Vec<u8> = Vec::with_capacity(256);
        let mut lines = Vec::new();
        let mut last_data: Option<Instant> = None;
        let mut chunk = [0u8; 256];

        loop {
            cancel.check()?;

            let mut got_data = false;
            let available = self
                .link
                .bytes_available()
                .context("failed to query pending bytes")?;
            if available > 0 {
                let want = available.min(chunk.len());
                let n = self
                    .link
                    .read_into(&mut chunk[..want])
                    .context("failed to read from device")?;
                if n > 0 {
                    let seen = lines.len();
                    pending.extend_from_slice(&chunk[..n]);
                    drain_complete_lines(&mut pending, &mut lines);
                    if pending.len() >= MAX_LINE_LEN {
                        push_line(&pending, &mut lines);
                        pending.clear();
                    }
                    last_data = Some(Instant::now());
                    got_data = true;

                    if let Some(done) = done {
                        if lines[seen..].iter().any(|line| done(line.as_str())) {
                            break;
                        }
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            if got_data {
                continue;
            }
            if let (None, Some(at)) = (done, last_data) {
                if now.duration_since(at) >= self.idle_gap {
                    break;
                }
            }
            sleep_cancellable(POLL_INTERVAL.min(deadline - now), cancel)?;
        }

        push_line(&pending, &mut lines);
        for line in &lines {
            log::debug!("<- {line}");
        }
        Ok(lines)
    }

    /// Clear buffers, send `command`, collect the reply within `window`.
    ///
    /// Commands with a multi-step reply are read until their outcome line
    /// arrives; the rest stop at the idle gap.
    pub fn exchange(
        &mut self,
        command: &Command,
        window: Duration,
        cancel: &CancelFlag,
    ) -> Result<Vec<String>> {
        self.link
            .discard_buffers()
            .context("failed to clear serial buffers")?;
        self.send_line(&command.wire())?;
        if command.awaits_outcome() {
            self.collect_until(window, cancel, &|line: &str| command.is_outcome_line(line))
        } else {
            self.collect_lines(window, cancel)
        }
    }
}

fn drain_complete_lines(pending: &mut Vec<u8>, lines: &mut Vec<String>) {
    while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
        let raw: Vec<u8> = pending.drain(..=pos).collect();
        push_line(&raw, lines);
    }
}

fn push_line(raw: &[u8], lines: &mut Vec<String>) {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        lines.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::scripted::ScriptedDevice;

    fn quick_channel(device: ScriptedDevice) -> LineChannel<ScriptedDevice> {
        LineChannel::new(device).with_idle_gap(Duration::from_millis(20))
    }

    #[test]
    fn test_exchange_returns_trimmed_non_empty_lines() -> Result<()> {
        let device = ScriptedDevice::new().respond("PING", &["PONG\r", "", "  extra  "]);
        let mut channel = quick_channel(device.clone());

        let lines = channel.exchange(&Command::Ping, Duration::from_millis(200), &CancelFlag::new())?;
        assert_eq!(lines, vec!["PONG".to_string(), "extra".to_string()]);
        assert_eq!(device.sent(), vec!["PING".to_string()]);
        Ok(())
    }

    #[test]
    fn test_exchange_clears_stale_input_first() -> Result<()> {
        let device = ScriptedDevice::new()
            .banner(&["stale boot noise"])
            .respond("COUNT", &["TEMPLATES:3"]);
        let mut channel = quick_channel(device);

        let lines = channel.exchange(&Command::Count, Duration::from_millis(200), &CancelFlag::new())?;
        assert_eq!(lines, vec!["TEMPLATES:3".to_string()]);
        Ok(())
    }

    #[test]
    fn test_silent_device_waits_for_full_window() -> Result<()> {
        let mut channel = quick_channel(ScriptedDevice::new());
        let start = Instant::now();

        let lines = channel.exchange(&Command::Info, Duration::from_millis(60), &CancelFlag::new())?;
        assert!(lines.is_empty());
        assert!(start.elapsed() >= Duration::from_millis(60));
        Ok(())
    }

    #[test]
    fn test_idle_gap_ends_collection_early() -> Result<()> {
        let device = ScriptedDevice::new().respond("PING", &["PONG"]);
        let mut channel = quick_channel(device);
        let start = Instant::now();

        channel.exchange(&Command::Ping, Duration::from_secs(5), &CancelFlag::new())?;
        assert!(start.elapsed() < Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn test_unterminated_fragment_is_kept() -> Result<()> {
        let device = ScriptedDevice::new().respond_raw("INFO", b"INFO:DY50\nTEMPLATES:9");
        let mut channel = quick_channel(device);

        let lines = channel.exchange(&Command::Info, Duration::from_millis(200), &CancelFlag::new())?;
        assert_eq!(lines, vec!["INFO:DY50".to_string(), "TEMPLATES:9".to_string()]);
        Ok(())
    }

    /// Never stops talking.
    struct Chatter(&'static [u8]);

    impl SerialLink for Chatter {
        fn write_all(&mut self, _bytes: &[u8]) -> io::Result<()> {
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn bytes_available(&mut self) -> io::Result<usize> {
            Ok(self.0.len())
        }

        fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            Ok(n)
        }

        fn discard_buffers(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_window_ends_collection_while_data_keeps_arriving() -> Result<()> {
        let mut channel = LineChannel::new(Chatter(b"DBG:xyz\n"));
        let start = Instant::now();

        let lines = channel.collect_lines(Duration::from_millis(100), &CancelFlag::new())?;
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(!lines.is_empty());
        assert!(lines.iter().all(|line| line == "DBG:xyz"));
        Ok(())
    }

    #[test]
    fn test_unterminated_stream_is_cut_into_bounded_lines() -> Result<()> {
        let mut channel = LineChannel::new(Chatter(b"xxxxxxxx"));

        let lines = channel.collect_lines(Duration::from_millis(50), &CancelFlag::new())?;
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| line.len() <= MAX_LINE_LEN));
        Ok(())
    }

    #[test]
    fn test_enroll_waits_past_idle_gap_for_outcome() -> Result<()> {
        let device = ScriptedDevice::new()
            .respond("ENROLL:5", &["STATUS:ENROLL_START:5", "STATUS:PLACE_FINGER"])
            .respond_after("ENROLL:5", Duration::from_millis(300), &["STATUS:ENROLL_SUCCESS:5"]);
        let mut channel = quick_channel(device);

        let command = Command::Enroll(5);
        let lines = channel.exchange(&command, Duration::from_secs(5), &CancelFlag::new())?;
        assert_eq!(lines.last().map(String::as_str), Some("STATUS:ENROLL_SUCCESS:5"));
        assert!(command.matches_reply(&lines));
        Ok(())
    }

    #[test]
    fn test_verify_stops_at_error_line() -> Result<()> {
        let device = ScriptedDevice::new()
            .respond("VERIFY", &["STATUS:VERIFY_START"])
            .respond_after("VERIFY", Duration::from_millis(100), &["ERROR:NOT_FOUND:No match"]);
        let mut channel = quick_channel(device);
        let start = Instant::now();

        let lines = channel.exchange(&Command::Verify, Duration::from_secs(5), &CancelFlag::new())?;
        assert_eq!(lines, vec!["STATUS:VERIFY_START", "ERROR:NOT_FOUND:No match"]);
        assert!(start.elapsed() < Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn test_write_failure_surfaces_as_error() {
        let device = ScriptedDevice::new().fail_io("cable unplugged");
        let mut channel = quick_channel(device);

        let err = channel
            .exchange(&Command::Ping, Duration::from_millis(50), &CancelFlag::new())
            .unwrap_err();
        assert!(format!("{err:#}").contains("cable unplugged"));
    }
}
