//! Best-effort extraction of a structured payload embedded in free text.
//!
//! The external model does not guarantee a clean response: the JSON we asked
//! for may sit inside a code fence, behind wrapping prose, or stand alone.
//! Narrow contract: callers get a parsed `serde_json::Value` or an
//! `ExtractError`; nothing else in the crate needs to know how extraction was
//! attempted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no structured payload found in response")]
    NoPayload,
    #[error("payload located but not valid JSON: {0}")]
    Invalid(#[from] serde_json::Error),
}

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid fence regex"));

/// Locate and parse an embedded JSON object (`{...}`).
pub fn extract_object(text: &str) -> Result<Value, ExtractError> {
    extract(text, '{', '}')
}

/// Locate and parse an embedded JSON array (`[...]`).
pub fn extract_array(text: &str) -> Result<Value, ExtractError> {
    extract(text, '[', ']')
}

fn extract(text: &str, open: char, close: char) -> Result<Value, ExtractError> {
    // A fenced block is the strongest signal; try its contents first.
    if let Some(caps) = FENCE_RE.captures(text) {
        let inner = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        if let Some(slice) = balanced_slice(inner, open, close) {
            return Ok(serde_json::from_str(slice)?);
        }
    }
    // Otherwise the first balanced bracket run anywhere in the raw text.
    if let Some(slice) = balanced_slice(text, open, close) {
        return Ok(serde_json::from_str(slice)?);
    }
    Err(ExtractError::NoPayload)
}

/// First balanced `open..close` span in `text`. String-literal aware, so
/// brackets inside quoted values do not break the depth count.
fn balanced_slice(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_str = false;
    let mut escaped = false;

    for (i, ch) in text[start..].char_indices() {
        if in_str {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_str = false;
            }
            continue;
        }
        match ch {
            '"' => in_str = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
