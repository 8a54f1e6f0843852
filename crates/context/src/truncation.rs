/// Truncate `content` to at most `max_chars` characters (respecting UTF-8
/// boundaries) and append a `[TRUNCATED]` marker when it was cut.
pub fn truncate_to(content: &str, max_chars: usize) -> (String, bool) {
    if content.len() <= max_chars {
        return (content.to_string(), false);
    }
    let boundary = content.floor_char_boundary(max_chars);
    let mut result = content[..boundary].to_string();
    result.push_str("\n\n[TRUNCATED]\n");
    (result, true)
}

/// Replace `content` with a short placeholder noting its original size.
/// Used by compaction strategies that drop stale tool output wholesale
/// rather than truncating it.
pub fn redact_with_placeholder(content: &str) -> String {
    format!("[cleared — {} chars removed during compaction]", content.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_truncation_when_under_limit() {
        let (result, truncated) = truncate_to("hello world", 100);
        assert_eq!(result, "hello world");
        assert!(!truncated);
    }

    #[test]
    fn truncates_at_limit() {
        let content = "abcdefghij";
        let (result, truncated) = truncate_to(content, 5);
        assert!(truncated);
        assert!(result.starts_with("abcde"));
        assert!(result.contains("[TRUNCATED]"));
    }

    #[test]
    fn truncates_respect_utf8_boundary() {
        let content = "a€€€€"; // multi-byte chars
        let (result, truncated) = truncate_to(content, 2);
        assert!(truncated);
        assert!(result.is_char_boundary(result.len() - "\n\n[TRUNCATED]\n".len()));
    }

    #[test]
    fn redact_reports_original_size() {
        let redacted = redact_with_placeholder("0123456789");
        assert!(redacted.contains("10 chars"));
    }
}
