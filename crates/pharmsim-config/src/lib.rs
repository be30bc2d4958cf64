//! # pharmsim-config
//!
//! TOML configuration for PharmSim.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use pharmsim_config::SimConfig;
//!
//! let config = SimConfig::from_file(Path::new("pharmsim.toml"))?;
//! let key = config.api_key()?;
//! ```
//!
//! Sections: `[model]` (backend URL, models, timeout, temperature),
//! `[hints]` (daily budget), `[avatar]` (presentation for "Other" gender),
//! and `[store]` (local store directory).

pub mod loader;
pub mod settings;

pub use settings::{AvatarSettings, HintSettings, ModelSettings, SimConfig, StoreSettings};

// ── Tests ─────────────────────────────────────────────────────────────────────
