//! Provider-agnostic error helpers.

use pharmsim_contracts::error::SimError;

/// Longest slice of a response body quoted in an error.
const MAX_BODY_IN_ERROR: usize = 300;

/// Helper function to create an error for a missing API key
pub fn missing_api_key_error(provider: &str) -> SimError {
    SimError::Config {
        reason: format!("API key not configured for {provider}"),
    }
}

fn excerpt(body: &str) -> &str {
    let body = body.trim();
    match body.char_indices().nth(MAX_BODY_IN_ERROR) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Helper function to map an HTTP error status to `SimError::Upstream`
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> SimError {
    let reason = match status {
        401 => format!("{provider}: invalid API key"),
        403 => format!("{provider}: access denied"),
        404 => format!("{provider}: model or endpoint not found: {}", excerpt(body)),
        429 => format!("{provider}: rate limited: {}", excerpt(body)),
        400 => format!("{provider}: invalid request: {}", excerpt(body)),
        500..=599 => format!("{provider}: server error (HTTP {status}): {}", excerpt(body)),
        _ => format!("{provider}: HTTP {status}: {}", excerpt(body)),
    };
    SimError::Upstream { reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_error() {
        match missing_api_key_error("gemini") {
            SimError::Config { reason } => assert!(reason.contains("gemini")),
            other => panic!("expected Config, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_http_error() {
        match parse_http_error(401, "unauthorized", "gemini") {
            SimError::Upstream { reason } => assert!(reason.contains("invalid API key")),
            other => panic!("expected Upstream, got {:?}", other),
        }

        match parse_http_error(503, "overloaded", "gemini") {
            SimError::Upstream { reason } => {
                assert!(reason.contains("503"));
                assert!(reason.contains("overloaded"));
            }
            other => panic!("expected Upstream, got {:?}", other),
        }
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(5_000);
        let SimError::Upstream { reason } = parse_http_error(400, &body, "gemini") else {
            panic!("expected Upstream");
        };
        assert!(reason.len() < 400);
    }
}
