//! # pharmsim-llm
//!
//! Implementations of `pharmsim_core::traits::GenerativeModel`:
//!
//! - [`GeminiClient`]: the Gemini `generateContent` REST API via reqwest
//! - [`ScriptedModel`]: canned or computed replies for offline runs and tests

pub mod gemini;
pub mod http_client;
pub mod provider;
pub mod scripted;

pub use gemini::{GeminiClient, GeminiConfig, GEMINI_API_URL};
pub use scripted::ScriptedModel;
