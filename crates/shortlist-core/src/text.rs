//! Character-boundary-safe text helpers
//!
//! Snippet budgets are counted in characters, not bytes, so multi-byte
//! text never gets split mid-codepoint.

/// Character count of a string
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Truncate to at most `max_chars` characters
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Short single-line preview with a trailing ellipsis when truncated
pub fn excerpt(s: &str, max_chars: usize) -> String {
    if char_len(s) > max_chars {
        format!("{}...", truncate_chars(s, max_chars))
    } else {
        s.to_string()
    }
}
