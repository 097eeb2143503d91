//! Response body truncation for stored diagnostics.

/// Maximum characters of a response body kept on a submit record.
pub const MAX_RAW_CHARS: usize = 3_000;

/// Keep the first `max_chars` characters of `text`.
///
/// Counts characters, not bytes, so multi-byte text (the remote answers in
/// Chinese) is never split inside a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_owned(),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_returned_as_is() {
        assert_eq!(truncate_chars("hello", MAX_RAW_CHARS), "hello");
    }

    #[test]
    fn exact_boundary_returned_as_is() {
        let s = "x".repeat(MAX_RAW_CHARS);
        assert_eq!(truncate_chars(&s, MAX_RAW_CHARS).len(), MAX_RAW_CHARS);
    }

    #[test]
    fn long_body_is_cut_to_limit() {
        let s = "a".repeat(5_000);
        let cut = truncate_chars(&s, MAX_RAW_CHARS);
        assert_eq!(cut.chars().count(), 3_000);
    }

    #[test]
    fn counts_characters_not_bytes() {
        // Each '成' is 3 bytes.
        let s = "成".repeat(4_000);
        let cut = truncate_chars(&s, MAX_RAW_CHARS);
        assert_eq!(cut.chars().count(), MAX_RAW_CHARS);
        assert_eq!(cut.len(), MAX_RAW_CHARS * 3);
    }

    #[test]
    fn empty_input_returned_as_is() {
        assert_eq!(truncate_chars("", MAX_RAW_CHARS), "");
    }
}
