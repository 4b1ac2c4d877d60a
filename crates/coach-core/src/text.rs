//! Small text helpers shared by the detector and the context builders.
//!
//! All limits count `char`s, never bytes, so multi-byte text is never split
//! inside a code point.

/// Truncate to at most `max_chars`, replacing the tail with `...` when cut.
#[must_use]
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// The first `max_chars` characters of `text`.
#[must_use]
pub fn prefix(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
