//! Shared utilities

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// First `max_lines` lines of tool output for display, each cut to
/// `max_chars`, with a count of what was left out
pub fn preview(text: &str, max_lines: usize, max_chars: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let mut out: Vec<String> = lines
        .iter()
        .take(max_lines)
        .map(|l| truncate_chars(l, max_chars))
        .collect();
    if lines.len() > max_lines {
        out.push(format!("({} more lines)", lines.len() - max_lines));
    }
    out.join("\n")
}

/// Compact one-line rendering of tool arguments
pub fn args_summary(args: &serde_json::Value, max_chars: usize) -> String {
    match args {
        serde_json::Value::Object(map) if map.is_empty() => String::new(),
        serde_json::Value::Null => String::new(),
        other => truncate_chars(&other.to_string(), max_chars),
    }
}
