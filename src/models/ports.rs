//! Port naming helpers.
//!
//! Devices describe their ports in a compact range notation:
//! `"<prefix>|<start>-<end>"`, e.g. `"Gi1/0/|1-44"` expands to
//! `Gi1/0/1 ... Gi1/0/44`.

use regex_lite::Regex;
use std::sync::OnceLock;

fn trailing_number_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*?)(\d+)$").ok()).as_ref()
}

/// Expand a range definition into discrete port names.
/// Malformed definitions expand to nothing.
pub fn expand_port_range(definition: &str) -> Vec<String> {
    let Some((prefix, range)) = definition.split_once('|') else {
        return Vec::new();
    };
    let Some((start, end)) = range.split_once('-') else {
        return Vec::new();
    };
    let (Ok(start), Ok(end)) = (start.trim().parse::<u32>(), end.trim().parse::<u32>()) else {
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }
    (start..=end).map(|n| format!("{}{}", prefix, n)).collect()
}

/// Split a port name into its interface prefix and trailing port number.
///
/// The prefix keeps any separator: `"Gi1/0/12"` -> `("Gi1/0/", 12)`.
pub fn split_port(port: &str) -> Option<(&str, u32)> {
    let caps = trailing_number_re()?.captures(port.trim())?;
    let prefix = caps.get(1)?.as_str();
    let number = caps.get(2)?.as_str().parse().ok()?;
    Some((prefix, number))
}
