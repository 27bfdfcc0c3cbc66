use std::cmp::Ordering;

fn com_index(name: &str) -> Option<u32> {
    name.to_uppercase().strip_prefix("COM")?.parse::<u32>().ok()
}

/// Numeric COM order (COM2 before COM10), other names after, alphabetically.
pub(super) fn port_order(a: &str, b: &str) -> Ordering {
    match (com_index(a), com_index(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::super::{sort_and_dedup, tests::plain};

    #[test]
    fn windows_com_numeric_order() {
        let input = vec![plain("COM10"), plain("COM3"), plain("CNCA0"), plain("COM2")];
        let names: Vec<String> = sort_and_dedup(input).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["COM2", "COM3", "COM10", "CNCA0"]);
    }
}
