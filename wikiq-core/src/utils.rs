//! Text utilities shared across crates.
//!
//! Pure functions: truncation for tool output and log previews, and the
//! `{placeholder}` template formatter used for judge prompts and reports.

use crate::error::ConfigError;

/// Keep the first `max_chars` characters and mark the cut with `...`.
///
/// Character-based, so multi-byte text is never split mid-codepoint.
///
/// # Examples
///
/// ```
/// use wikiq_core::truncate;
///
/// assert_eq!(truncate("hello world", 5), "hello...");
/// assert_eq!(truncate("short", 10), "short");
/// ```
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &s[..byte_idx]),
        None => s.to_string(),
    }
}

/// Substitute `{name}` placeholders in `template`.
///
/// `{{` and `}}` produce literal braces. A placeholder that is not in `values`,
/// an unclosed `{`, or a stray `}` is a [`ConfigError::Template`].
///
/// # Examples
///
/// ```
/// use wikiq_core::format_template;
///
/// let out = format_template("{greeting}, {{name}}", &[("greeting", "hi")]).unwrap();
/// assert_eq!(out, "hi, {name}");
/// assert!(format_template("{missing}", &[]).is_err());
/// ```
pub fn format_template(template: &str, values: &[(&str, &str)]) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => {
                            return Err(ConfigError::Template(format!(
                                "unclosed placeholder '{{{}'",
                                name
                            )))
                        }
                        Some(ch) => name.push(ch),
                    }
                }
                let value = values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .ok_or_else(|| {
                        ConfigError::Template(format!("unknown placeholder '{{{}}}'", name))
                    })?;
                out.push_str(value);
            }
            '}' => {
                return Err(ConfigError::Template(
                    "single '}' encountered in template".to_string(),
                ))
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}
