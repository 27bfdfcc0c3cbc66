use std::cmp::Ordering;

/// USB/ACM adapters first, then on-board ttys, then everything else.
fn priority(name: &str) -> i32 {
    let n = name.to_lowercase();
    if n.contains("acm") {
        0
    } else if n.contains("ttyusb") || n.contains("usb") {
        1
    } else if n.contains("ttys") || n.contains("serial") {
        2
    } else {
        10
    }
}

pub(super) fn port_order(a: &str, b: &str) -> Ordering {
    priority(a).cmp(&priority(b)).then_with(|| a.cmp(b))
}
