/// Keep at most `max_chars` characters of `s`, cutting on a character boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Strip markdown code fences some models wrap around JSON.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let text = "Hello 世界!";
        assert_eq!(truncate_chars(text, 7), "Hello 世");
    }

    #[test]
    fn truncate_within_bounds() {
        assert_eq!(truncate_chars("Hello", 100), "Hello");
        assert_eq!(truncate_chars("Hello", 5), "Hello");
        assert_eq!(truncate_chars("Hello", 0), "");
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("{}"), "{}");
    }
}
