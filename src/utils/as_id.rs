//! AS identifier helpers.
//!
//! Test topologies all live in the `ffaa:0:` range, so fixtures and topology
//! files refer to ASes by their numeric tail and expand it here.

/// Prefix shared by all expanded AS identifiers
pub const AS_ID_PREFIX: &str = "ffaa:0:";

/// Expand a numeric tail into a canonical AS identifier.
///
/// The tail is rendered as lowercase hex without leading zeros, so distinct
/// tails always give distinct identifiers.
///
/// # Examples
/// ```
/// use sciontopo::utils::as_id::expand_as_id;
///
/// assert_eq!(expand_as_id(0x1101), "ffaa:0:1101");
/// assert_eq!(expand_as_id(0xabc), "ffaa:0:abc");
/// ```
pub fn expand_as_id(tail: u64) -> String {
    format!("{}{:x}", AS_ID_PREFIX, tail)
}

/// Inverse of [`expand_as_id`].
///
/// Returns `None` for anything `expand_as_id` would never produce, including
/// hex with leading zeros or uppercase digits.
pub fn parse_as_id(as_id: &str) -> Option<u64> {
    let hex = as_id.strip_prefix(AS_ID_PREFIX)?;
    if hex.is_empty() || (hex.len() > 1 && hex.starts_with('0')) {
        return None;
    }
    if !hex.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
        return None;
    }
    u64::from_str_radix(hex, 16).ok()
}

/// Short form of an AS identifier: the group after the last `:`.
pub fn as_id_suffix(as_id: &str) -> &str {
    as_id.rsplit(':').next().unwrap_or(as_id)
}
