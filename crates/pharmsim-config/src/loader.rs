//! Loading and validating `SimConfig`.

use std::path::Path;

use tracing::debug;

use pharmsim_contracts::error::{SimError, SimResult};

use crate::settings::SimConfig;

fn config_error(reason: impl Into<String>) -> SimError {
    SimError::Config {
        reason: reason.into(),
    }
}

impl SimConfig {
    /// Parse `s` as TOML and validate it.
    ///
    /// Returns `SimError::Config` if the TOML is malformed, has unknown keys,
    /// or holds out-of-range values.
    pub fn from_toml_str(s: &str) -> SimResult<Self> {
        let config: SimConfig =
            toml::from_str(s).map_err(|e| config_error(format!("failed to parse config TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML configuration.
    pub fn from_file(path: &Path) -> SimResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            config_error(format!("failed to read config file '{}': {e}", path.display()))
        })?;
        debug!(path = %path.display(), "loading config");
        Self::from_toml_str(&contents)
    }

    /// `from_file` when a path is given, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> SimResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        let model = &self.model;
        if !(model.base_url.starts_with("http://") || model.base_url.starts_with("https://")) {
            return Err(config_error(format!(
                "model.base_url must be an http(s) URL, got '{}'",
                model.base_url
            )));
        }
        if model.api_key_env.trim().is_empty() {
            return Err(config_error("model.api_key_env must not be empty"));
        }
        if model.case_model.trim().is_empty() || model.chat_model.trim().is_empty() {
            return Err(config_error("model.case_model and model.chat_model must not be empty"));
        }
        if model.timeout_secs == 0 {
            return Err(config_error("model.timeout_secs must be at least 1"));
        }
        if !(0.0..=2.0).contains(&model.temperature) {
            return Err(config_error(format!(
                "model.temperature must be within 0.0..=2.0, got {}",
                model.temperature
            )));
        }
        Ok(())
    }

    /// The API key from the configured environment variable.
    pub fn api_key(&self) -> SimResult<String> {
        let var = &self.model.api_key_env;
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(config_error(format!("environment variable {var} is not set"))),
        }
    }
}
