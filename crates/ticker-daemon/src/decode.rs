//! Best-effort decoder for structured text returned by the AI source.
//!
//! Models often wrap JSON in a Markdown code fence (```` ```json ... ``` ````).
//! The fence is stripped when it encloses the whole answer, then the rest is
//! parsed with serde. Failure is a value, not a panic.

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```(\w*)?\s*\n?(.*?)\n?\s*```$").expect("fence pattern is valid")
});

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("empty payload")]
    Empty,
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Remove an enclosing code fence, if any, and trim.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match FENCE.captures(trimmed).and_then(|caps| caps.get(2)) {
        Some(body) if !body.as_str().is_empty() => body.as_str().trim(),
        _ => trimmed,
    }
}

pub fn decode_fenced_json<T: DeserializeOwned>(text: &str) -> Result<T, DecodeError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(serde_json::from_str(body)?)
}

/// Shorten raw upstream text for log lines.
pub fn excerpt(text: &str) -> String {
    const MAX: usize = 200;
    if text.chars().count() <= MAX {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX).collect();
    format!("{head}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Topic {
        title: String,
        summaries: Vec<String>,
    }

    #[test]
    fn test_plain_json() {
        let v: Vec<String> = decode_fenced_json(r#"  ["a", "b"]  "#).unwrap();
        assert_eq!(v, vec!["a", "b"]);
    }

    #[test]
    fn test_fenced_with_language_tag() {
        let raw = "```json\n{\"title\":\"T\",\"summaries\":[\"s\"]}\n```";
        let t: Topic = decode_fenced_json(raw).unwrap();
        assert_eq!(t.title, "T");
        assert_eq!(t.summaries, vec!["s"]);
    }

    #[test]
    fn test_fenced_without_language_tag() {
        let raw = "```\n[1, 2, 3]\n```";
        let v: Vec<u32> = decode_fenced_json(raw).unwrap();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn test_prose_is_an_error() {
        let res: Result<Vec<String>, _> =
            decode_fenced_json("Xin lỗi, tôi không thể trả lời câu hỏi này.");
        assert!(matches!(res, Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_fenced_garbage_is_an_error() {
        let res: Result<Topic, _> = decode_fenced_json("```json\n{ not json }\n```");
        assert!(res.is_err());
    }

    #[test]
    fn test_empty_is_an_error() {
        let res: Result<Topic, _> = decode_fenced_json("   ");
        assert!(matches!(res, Err(DecodeError::Empty)));
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let long = "đ".repeat(300);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), 201);
        assert!(cut.ends_with('…'));
        assert_eq!(excerpt("ngắn"), "ngắn");
    }
}
