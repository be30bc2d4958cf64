//! Output verification schema and report types.
//!
//! Structured model output (cases, debriefs) is checked against an
//! `OutputSchema` before it is deserialized into a typed object. Only a
//! passing `VerificationReport` lets the document through.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The full specification a model document is checked against.
///
/// Combines a JSON Schema document, which is also sent to the model as its
/// output constraint, with semantic rules JSON Schema cannot express.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSchema {
    /// Unique identifier for this schema (e.g. "pharmacy-case-v1").
    pub schema_id: String,
    /// A JSON Schema document used for structural validation.
    pub json_schema: Value,
    /// Additional rules evaluated after structural validation.
    pub rules: Vec<VerificationRule>,
}

/// A single verification rule applied to a model document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRule {
    /// Unique identifier for this rule, referenced in failure reports.
    pub rule_id: String,
    /// Human-readable description for logs.
    pub description: String,
    pub rule_type: VerificationRuleType,
}

/// The kinds of verification checks supported out of the box.
///
/// `Custom` lets the engine hook in case-specific logic by name, keeping the
/// verifier itself free of pharmacy knowledge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VerificationRuleType {
    /// The field at `field_path` must be present, non-null, and not a blank string.
    RequiredField {
        /// Dotted path, e.g. "patientProfile.name".
        field_path: String,
    },

    /// The field at `field_path` must equal one of `allowed`.
    AllowedValues { field_path: String, allowed: Vec<Value> },

    /// The array at `field_path` must have between `min` and `max` items, inclusive.
    ArrayLength { field_path: String, min: usize, max: usize },

    /// Exactly one object in the array at `field_path` has `flag == true`.
    ExactlyOneFlagged { field_path: String, flag: String },

    /// Delegate to a named function registered with the verifier.
    Custom { function_name: String },
}

/// The result of running all rules in an `OutputSchema` against a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// True only if all rules passed.
    pub passed: bool,
    /// All failures collected during this run. Empty on pass.
    pub failures: Vec<VerificationFailure>,
}

impl VerificationReport {
    /// One line per failure, `[rule-id] message`, joined with "; ".
    pub fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("[{}] {}", f.rule_id, f.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationFailure {
    /// The `rule_id` of the rule that failed.
    pub rule_id: String,
    pub message: String,
}
