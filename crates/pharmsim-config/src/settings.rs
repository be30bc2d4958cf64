//! Configuration sections.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration. Unknown keys are rejected so typos surface at startup.
//!
//! Example:
//! ```toml
//! [model]
//! case_model = "gemini-2.5-pro"
//! timeout_secs = 90
//!
//! [hints]
//! daily_budget = 5
//!
//! [avatar]
//! other_gender_presentation = "Male"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use pharmsim_contracts::avatar::PresentationGender;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// The generative-model backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSettings {
    pub base_url: String,
    /// Name of the environment variable holding the API key. The key itself
    /// is never written to the config file.
    pub api_key_env: String,
    /// Model used for cases, hints, debriefs, and the specialty pick.
    pub case_model: String,
    /// Model used for the patient conversation.
    pub chat_model: String,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            case_model: DEFAULT_MODEL.to_string(),
            chat_model: DEFAULT_MODEL.to_string(),
            timeout_secs: 60,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HintSettings {
    pub daily_budget: u32,
}

impl Default for HintSettings {
    fn default() -> Self {
        Self { daily_budget: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AvatarSettings {
    /// Presentation used for patients whose gender is "Other".
    pub other_gender_presentation: PresentationGender,
}

impl Default for AvatarSettings {
    fn default() -> Self {
        Self {
            other_gender_presentation: PresentationGender::Female,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    /// Directory for the local store. `None` lets the caller pick a platform default.
    pub dir: Option<PathBuf>,
}

/// The top-level structure deserialized from a TOML config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub model: ModelSettings,
    pub hints: HintSettings,
    pub avatar: AvatarSettings,
    pub store: StoreSettings,
}
