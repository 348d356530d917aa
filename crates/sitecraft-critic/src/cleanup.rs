/// Remove a surrounding Markdown code fence, if any.
///
/// Handles both ```` ```html ```` style openers and a bare ```` ``` ````.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the language tag line
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Slice from the first `{` to the last `}` after fence stripping
pub fn extract_json_object(text: &str) -> Option<&str> {
    let text = strip_code_fences(text);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Whether text plausibly holds a full HTML document
pub fn looks_like_html(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("<html") || lower.contains("<!doctype html")
}
