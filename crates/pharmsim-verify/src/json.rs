//! Tolerant parsing of model JSON.
//!
//! Models often wrap JSON in markdown fences (```` ```json ... ``` ````) or add
//! a sentence before it. These helpers strip that noise before parsing.

use serde::de::DeserializeOwned;
use tracing::warn;

use pharmsim_contracts::error::{SimError, SimResult};

/// Strip a triple-backtick fence and its optional `json` language tag.
///
/// Text outside the fence is discarded. Input without a fence is returned
/// trimmed. An unterminated fence keeps everything after the opening line.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };

    let mut body = &trimmed[start + 3..];
    if body.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
        body = &body[4..];
    }

    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Parse model output into `T`, returning a `ParseError` on failure.
pub fn try_parse_model_json<T: DeserializeOwned>(raw: &str) -> SimResult<T> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(SimError::Parse {
            reason: "model returned an empty response".to_string(),
        });
    }
    serde_json::from_str(body).map_err(|e| SimError::Parse {
        reason: e.to_string(),
    })
}

/// Parse model output into `T`, or log the `ParseError` and return `fallback`.
pub fn parse_model_json<T: DeserializeOwned>(raw: &str, fallback: T) -> T {
    match try_parse_model_json(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, raw_len = raw.len(), "model JSON unparseable, using fallback");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Pearls {
        items: Vec<String>,
        count: u32,
    }

    #[test]
    fn fenced_json_with_tag_round_trips() {
        let original = Pearls {
            items: vec!["Check renal function".to_string(), "Counsel on timing".to_string()],
            count: 2,
        };
        let raw = format!("```json\n{}\n```", serde_json::to_string(&original).unwrap());

        let parsed: Pearls = try_parse_model_json(&raw).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn fence_without_tag_and_surrounding_prose() {
        let raw = "Here you go:\n```\n{\"a\": 1}\n```\nHope that helps.";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");

        let raw = "```JSON\n[1, 2]\n```";
        assert_eq!(strip_code_fences(raw), "[1, 2]");
    }

    #[test]
    fn bare_json_is_untouched() {
        assert_eq!(strip_code_fences("  {\"a\": 1}\n"), "{\"a\": 1}");
        let value: serde_json::Value = try_parse_model_json("{\"a\": 1}").unwrap();
        assert_eq!(value, json!({ "a": 1 }));
    }

    #[test]
    fn unterminated_fence_still_parses() {
        let value: serde_json::Value = try_parse_model_json("```json\n{\"a\": true}").unwrap();
        assert_eq!(value, json!({ "a": true }));
    }

    #[test]
    fn garbage_returns_parse_error() {
        let result: SimResult<Pearls> = try_parse_model_json("I'm sorry, I can't do that.");
        assert!(matches!(result, Err(SimError::Parse { .. })));

        let result: SimResult<Pearls> = try_parse_model_json("```json\n```");
        assert!(matches!(result, Err(SimError::Parse { .. })));
    }

    #[test]
    fn fallback_is_returned_on_failure() {
        let fallback = Pearls { items: vec![], count: 0 };
        let parsed = parse_model_json("{\"items\": \"oops\"}", fallback);
        assert_eq!(parsed, Pearls { items: vec![], count: 0 });
    }
}
