//! # pharmsim-verify
//!
//! Parsing and verification of generative-model output.
//!
//! This crate provides:
//!
//! - [`engine::SchemaVerifier`], which implements the
//!   [`pharmsim_core::traits::Verifier`] trait in two phases: JSON Schema
//!   validation via the `jsonschema` crate, then semantic rules
//!   (`RequiredField`, `AllowedValues`, `ArrayLength`, `ExactlyOneFlagged`,
//!   `Custom`).
//! - [`json`], fence-tolerant JSON parsing with a logged fallback.
//! - [`clinical_text`], the "Label: value" grammar for exam and lab text.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use pharmsim_verify::engine::SchemaVerifier;
//!
//! let mut verifier = SchemaVerifier::new();
//! verifier.register_rule("mcq-answer-index", Box::new(|doc| {
//!     doc.get("mcqs").is_none().then(|| "mcqs missing".to_string())
//! }));
//! ```

pub mod clinical_text;
pub mod engine;
pub mod json;

pub use engine::SchemaVerifier;
pub use json::{parse_model_json, strip_code_fences, try_parse_model_json};
