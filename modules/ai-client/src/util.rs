/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Return the body of the first fenced code block in `response`, if any.
///
/// Models often wrap JSON in prose ("Here is the data: ```json ... ```"),
/// so the fence is searched for anywhere, not just at the start.
pub fn extract_fenced_block(response: &str) -> Option<&str> {
    let open = response.find("```")?;
    let after_open = &response[open + 3..];
    let close = after_open.find("```")?;
    let inner = &after_open[..close];
    // The first line is an info string (e.g. `json`) unless it already holds the payload.
    let body = match inner.split_once('\n') {
        Some((info, rest)) if !info.trim_start().starts_with(['{', '[']) => rest,
        _ => inner,
    };
    Some(body.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_char_boundary() {
        let text = "Hello 世界";
        let truncated = truncate_to_char_boundary(text, 8);
        assert!(truncated.len() <= 8);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn test_truncate_within_bounds() {
        let text = "Hello";
        assert_eq!(truncate_to_char_boundary(text, 100), "Hello");
    }

    #[test]
    fn fenced_block_inside_prose() {
        let text = "Here is the filing:\n```json\n{\"a\": 1}\n```\nLet me know.";
        assert_eq!(extract_fenced_block(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn unterminated_fence_yields_none() {
        assert_eq!(extract_fenced_block("```json\n{\"a\": 1}"), None);
        assert_eq!(extract_fenced_block("{\"a\": 1}"), None);
    }
}
