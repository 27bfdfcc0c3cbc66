use crate::protocol::tty::{self, PortEntry};

/// Return available ports with likely Arduino boards first.
pub fn enumerate_ports() -> Vec<PortEntry> {
    tty::available_ports_sorted()
}

/// One human-readable line per port for `--list-ports`.
pub fn describe_port(entry: &PortEntry) -> String {
    let mut line = format!("{:<24} {}", entry.name, entry.kind);
    if let (Some(vid), Some(pid)) = (entry.vid, entry.pid) {
        line.push_str(&format!(" vid:{vid:04x} pid:{pid:04x}"));
    }
    if let Some(product) = &entry.product {
        line.push_str(&format!(" \"{product}\""));
    }
    if let Some(bridge) = entry.bridge {
        line.push_str(&format!(" [{bridge}]"));
    }
    line
}
