//! Shared HTTP client construction.

use std::time::Duration;

use pharmsim_contracts::error::{SimError, SimResult};

/// Build a reqwest client with a whole-request timeout.
pub fn build_http_client(timeout: Duration) -> SimResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SimError::Config {
            reason: format!("failed to build HTTP client: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(Duration::from_secs(30)).is_ok());
    }
}
