//! IDs made of several `/`-separated parts

use super::TranslateError;

const SEPARATOR: &str = "/";

/// Splits `id` into exactly `parts` non-empty segments
pub fn parse(id: &str, parts: usize) -> Result<Vec<String>, TranslateError> {
    let segments: Vec<&str> = id.split(SEPARATOR).collect();
    if segments.len() != parts || segments.iter().any(|s| s.is_empty()) {
        return Err(TranslateError::MalformedId {
            id: id.to_string(),
            expected: format!("{} parts separated by '{}'", parts, SEPARATOR),
        });
    }
    Ok(segments.into_iter().map(str::to_string).collect())
}

pub fn join(parts: &[&str]) -> String {
    parts.join(SEPARATOR)
}
