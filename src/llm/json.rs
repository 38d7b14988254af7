//! Helpers for pulling JSON out of free-form completion text.
//!
//! Models like to wrap JSON in markdown code blocks or surround it with
//! chatter, so every structured response goes through here before
//! `serde_json` sees it.

use serde::de::IgnoredAny;
use serde::Deserialize;

/// Remove a markdown code fence (with optional language tag) around the text.
pub fn strip_code_fences(text: &str) -> &str {
    let Some(start) = text.find("```") else {
        return text.trim();
    };
    let after = &text[start + 3..];

    // A language tag is a single word on the opening fence line.
    let (first_line, remainder) = match after.find('\n') {
        Some(i) => (&after[..i], &after[i + 1..]),
        None => ("", after),
    };
    let body = if first_line.trim().chars().all(|c| c.is_ascii_alphanumeric()) {
        remainder
    } else {
        after
    };

    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Extract the first well-formed JSON object from completion text.
pub fn extract_json_object(text: &str) -> Option<&str> {
    extract_delimited(strip_code_fences(text), '{', '}')
}

/// Extract the first well-formed JSON array from completion text.
pub fn extract_json_array(text: &str) -> Option<&str> {
    extract_delimited(strip_code_fences(text), '[', ']')
}

/// Widest `open..=close` slice that parses, trying starts left to right.
///
/// Prose around the payload may carry its own brackets ("[all real]"), so
/// the first opener is not necessarily the JSON.
fn extract_delimited(text: &str, open: char, close: char) -> Option<&str> {
    let ends: Vec<usize> = text.rmatch_indices(close).map(|(i, _)| i).collect();
    text.match_indices(open).find_map(|(start, _)| {
        ends.iter()
            .take_while(|&&end| end > start)
            .map(|&end| &text[start..=end])
            .find(|candidate| serde_json::from_str::<IgnoredAny>(candidate).is_ok())
    })
}

/// A number the model may have written as `12`, `12.0` or `"12"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            NumberOrText::Number(n) => Some(*n),
            NumberOrText::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value.filter(|n| n.is_finite())
    }
}
