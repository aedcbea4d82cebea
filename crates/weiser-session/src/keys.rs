//! Redis key builders for session records.
//!
//! Centralising key construction keeps the prefix handling for writes,
//! scans and id recovery in one place.

/// Full key for a session id.
pub fn session_key(prefix: &str, id: &str) -> String {
    format!("{prefix}{id}")
}

/// `SCAN MATCH` pattern covering every session key under `prefix`.
///
/// Glob metacharacters in the prefix are escaped so that only the trailing
/// `*` acts as a wildcard.
pub fn scan_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

/// Recover the session id from a full key.
pub fn id_from_key<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(prefix).filter(|id| !id.is_empty())
}
