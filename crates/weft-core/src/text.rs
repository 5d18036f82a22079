//! UTF-8-safe string truncation.
//!
//! `&s[..n]` panics when `n` falls inside a multi-byte character; this
//! helper snaps back to the nearest char boundary. Used to keep log lines
//! short when previewing streamed payload fragments.

/// Truncate `s` to at most `max_bytes` bytes at a char boundary.
///
/// Returns the longest prefix of `s` whose byte length is <= `max_bytes`
/// and that does not split a multi-byte character.
#[inline]
#[must_use]
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    // `floor_char_boundary` is nightly-only; walk back to a boundary.
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
