// Platform-dispatched port enumeration

use serde::Serialize;
use serialport::{SerialPortInfo, SerialPortType};
use std::collections::HashSet;

#[cfg(windows)]
mod tty_windows;
#[cfg(windows)]
use tty_windows::port_order;

#[cfg(unix)]
mod tty_unix;
#[cfg(unix)]
use tty_unix::port_order;

#[cfg(not(any(unix, windows)))]
fn port_order(a: &str, b: &str) -> std::cmp::Ordering {
    a.cmp(b)
}

/// USB vendor ids of boards and USB-serial bridges commonly found on Arduinos.
const ARDUINO_LIKE_VIDS: &[(u16, &str)] = &[
    (0x2341, "Arduino"),
    (0x2a03, "Arduino"),
    (0x1a86, "CH340"),
    (0x0403, "FTDI"),
    (0x10c4, "CP210x"),
];

/// A serial port as shown by `--list-ports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortEntry {
    pub name: String,
    pub kind: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub product: Option<String>,
    /// Bridge family when the vendor id is a known Arduino/USB-serial chip.
    pub bridge: Option<&'static str>,
}

impl PortEntry {
    pub fn from_info(info: &SerialPortInfo) -> Self {
        match &info.port_type {
            SerialPortType::UsbPort(usb) => PortEntry {
                name: info.port_name.clone(),
                kind: "usb".to_string(),
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                product: usb.product.clone(),
                bridge: bridge_for_vid(usb.vid),
            },
            other => PortEntry {
                name: info.port_name.clone(),
                kind: match other {
                    SerialPortType::PciPort => "pci",
                    SerialPortType::BluetoothPort => "bluetooth",
                    _ => "unknown",
                }
                .to_string(),
                vid: None,
                pid: None,
                product: None,
                bridge: None,
            },
        }
    }

    pub fn is_arduino_like(&self) -> bool {
        self.bridge.is_some()
    }
}

pub fn bridge_for_vid(vid: u16) -> Option<&'static str> {
    ARDUINO_LIKE_VIDS
        .iter()
        .find(|(known, _)| *known == vid)
        .map(|(_, name)| *name)
}

/// Return the available ports, deduplicated and in platform display order.
pub fn available_ports_sorted() -> Vec<PortEntry> {
    let raw = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(err) => {
            log::warn!("Serial port enumeration failed: {err}");
            Vec::new()
        }
    };
    sort_and_dedup(raw.iter().map(PortEntry::from_info).collect())
}

pub(crate) fn sort_and_dedup(entries: Vec<PortEntry>) -> Vec<PortEntry> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut ports: Vec<PortEntry> = entries
        .into_iter()
        .filter(|p| {
            let key = match (p.vid, p.pid) {
                (Some(vid), Some(pid)) => {
                    format!("{}:vid={vid:04x}:pid={pid:04x}", p.name.to_lowercase())
                }
                _ => p.name.to_lowercase(),
            };
            seen.insert(key)
        })
        .collect();

    // Likely boards first, then the platform's own ordering.
    ports.sort_by(|a, b| {
        b.is_arduino_like()
            .cmp(&a.is_arduino_like())
            .then_with(|| port_order(&a.name, &b.name))
    });
    ports
}
