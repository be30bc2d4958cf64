//! Schema-based verifier for model documents.
//!
//! `SchemaVerifier` implements the `Verifier` trait from `pharmsim-core`.
//! Verification runs in two phases:
//!
//! 1. **Structural**: the document is validated against
//!    `OutputSchema::json_schema` using the `jsonschema` crate.
//! 2. **Semantic**: each `VerificationRule` in `OutputSchema::rules` is
//!    evaluated in order.  All failures are collected before returning so the
//!    log shows the full failure set in one pass.
//!
//! Custom rules delegate to named functions registered via `register_rule`,
//! so case-specific checks live with the engine that defines the case shape.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use pharmsim_contracts::{
    error::SimResult,
    verify::{OutputSchema, VerificationFailure, VerificationReport, VerificationRuleType},
};
use pharmsim_core::traits::Verifier;

/// A caller-supplied verification function.
///
/// Receives the whole document.  Returns `Some(message)` when the check fails,
/// or `None` on success.
pub type CustomVerifierFn = Box<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Combines JSON Schema structural validation with a set of semantic rules.
pub struct SchemaVerifier {
    custom_rules: HashMap<String, CustomVerifierFn>,
}

impl SchemaVerifier {
    /// Create a verifier with no custom rules registered.
    pub fn new() -> Self {
        Self {
            custom_rules: HashMap::new(),
        }
    }

    /// Register a custom verification function under `name`.
    ///
    /// The name must match the `function_name` of a `VerificationRuleType::Custom`
    /// rule. Registering the same name twice replaces the previous function.
    pub fn register_rule(&mut self, name: impl Into<String>, f: CustomVerifierFn) {
        self.custom_rules.insert(name.into(), f);
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    /// Resolve a dot-notation path (e.g. `"patientProfile.name"` or
    /// `"mcqs.0.options"`). Numeric segments index into arrays. Returns `None`
    /// when any segment is missing or the value is JSON `null`.
    pub(crate) fn resolve_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
        let mut current = value;
        for segment in path.split('.') {
            let next = match current {
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => current.get(segment),
            };
            match next {
                Some(v) if !v.is_null() => current = v,
                _ => return None,
            }
        }
        Some(current)
    }

    fn check_rule(&self, document: &Value, rule_type: &VerificationRuleType) -> Option<String> {
        match rule_type {
            // Present, non-null, and not a blank string.
            VerificationRuleType::RequiredField { field_path } => {
                match Self::resolve_path(document, field_path) {
                    None => Some(format!("required field '{field_path}' is missing or null")),
                    Some(Value::String(s)) if s.trim().is_empty() => {
                        Some(format!("required field '{field_path}' is blank"))
                    }
                    Some(_) => None,
                }
            }

            VerificationRuleType::AllowedValues { field_path, allowed } => {
                match Self::resolve_path(document, field_path) {
                    None => Some(format!(
                        "field '{field_path}' is missing; cannot check allowed values"
                    )),
                    Some(actual) if allowed.contains(actual) => None,
                    Some(actual) => Some(format!(
                        "field '{field_path}' has value {actual} which is not in the allowed set"
                    )),
                }
            }

            VerificationRuleType::ArrayLength { field_path, min, max } => {
                match Self::resolve_path(document, field_path).and_then(Value::as_array) {
                    None => Some(format!("field '{field_path}' is missing or not an array")),
                    Some(items) if items.len() < *min || items.len() > *max => Some(format!(
                        "field '{field_path}' has {} items, expected {min}..={max}",
                        items.len()
                    )),
                    Some(_) => None,
                }
            }

            VerificationRuleType::ExactlyOneFlagged { field_path, flag } => {
                match Self::resolve_path(document, field_path).and_then(Value::as_array) {
                    None => Some(format!("field '{field_path}' is missing or not an array")),
                    Some(items) => {
                        let flagged = items
                            .iter()
                            .filter(|item| item.get(flag.as_str()).and_then(Value::as_bool) == Some(true))
                            .count();
                        if flagged == 1 {
                            None
                        } else {
                            Some(format!(
                                "field '{field_path}' has {flagged} entries with '{flag}' set, expected exactly 1"
                            ))
                        }
                    }
                }
            }

            // An unregistered name is itself a failure so misconfigured rules
            // surface immediately.
            VerificationRuleType::Custom { function_name } => {
                match self.custom_rules.get(function_name.as_str()) {
                    Some(f) => f(document),
                    None => Some(format!(
                        "no custom rule registered for function name '{function_name}'"
                    )),
                }
            }
        }
    }
}

impl Default for SchemaVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Verifier for SchemaVerifier {
    fn verify(&self, document: &Value, schema: &OutputSchema) -> SimResult<VerificationReport> {
        let mut failures: Vec<VerificationFailure> = Vec::new();

        // ── Phase 1: JSON Schema structural validation ────────────────────────
        //
        // A null json_schema means "no structural constraint".
        if !schema.json_schema.is_null() {
            match jsonschema::validator_for(&schema.json_schema) {
                Ok(validator) => {
                    for error in validator.iter_errors(document) {
                        let message = format!(
                            "JSON Schema violation at {}: {}",
                            error.instance_path, error
                        );
                        warn!(schema_id = %schema.schema_id, %message, "structural validation failure");
                        failures.push(VerificationFailure {
                            rule_id: "json-schema".to_string(),
                            message,
                        });
                    }
                }
                Err(e) => {
                    let message = format!("invalid JSON Schema document: {e}");
                    warn!(schema_id = %schema.schema_id, %message, "schema compilation failure");
                    failures.push(VerificationFailure {
                        rule_id: "json-schema".to_string(),
                        message,
                    });
                }
            }
        }

        // ── Phase 2: Semantic rule evaluation ────────────────────────────────
        for rule in &schema.rules {
            debug!(
                rule_id = %rule.rule_id,
                description = %rule.description,
                "evaluating verification rule"
            );

            if let Some(message) = self.check_rule(document, &rule.rule_type) {
                warn!(rule_id = %rule.rule_id, %message, "semantic rule failed");
                failures.push(VerificationFailure {
                    rule_id: rule.rule_id.clone(),
                    message,
                });
            }
        }

        let passed = failures.is_empty();
        debug!(
            schema_id = %schema.schema_id,
            passed,
            failure_count = failures.len(),
            "verification complete"
        );

        Ok(VerificationReport { passed, failures })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use pharmsim_contracts::verify::{OutputSchema, VerificationRule, VerificationRuleType};
    use pharmsim_core::traits::Verifier;

    use super::SchemaVerifier;

    // ── Builder helpers ───────────────────────────────────────────────────────

    fn make_schema(json_schema: serde_json::Value, rules: Vec<VerificationRule>) -> OutputSchema {
        OutputSchema {
            schema_id: "test-schema-v1".to_string(),
            json_schema,
            rules,
        }
    }

    fn rule(id: &str, rule_type: VerificationRuleType) -> VerificationRule {
        VerificationRule {
            rule_id: id.to_string(),
            description: format!("{id} check"),
            rule_type,
        }
    }

    fn drps(flags: &[bool]) -> serde_json::Value {
        let items: Vec<_> = flags
            .iter()
            .enumerate()
            .map(|(i, f)| json!({ "problem": format!("problem {i}"), "isCorrect": f }))
            .collect();
        json!({ "drugRelatedProblems": items })
    }

    // ── JSON Schema ───────────────────────────────────────────────────────────

    #[test]
    fn test_schema_pass() {
        let verifier = SchemaVerifier::new();
        let json_schema = json!({
            "type": "object",
            "properties": { "title": { "type": "string" } },
            "required": ["title"]
        });

        let report = verifier
            .verify(&json!({ "title": "Case" }), &make_schema(json_schema, vec![]))
            .unwrap();

        assert!(report.passed, "expected pass, failures: {:?}", report.failures);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_schema_fail() {
        let verifier = SchemaVerifier::new();
        let json_schema = json!({
            "type": "object",
            "properties": { "title": { "type": "string" } },
            "required": ["title"]
        });

        let report = verifier
            .verify(&json!({ "other": 42 }), &make_schema(json_schema, vec![]))
            .unwrap();

        assert!(!report.passed);
        assert_eq!(report.failures[0].rule_id, "json-schema");
    }

    #[test]
    fn test_enum_violation_is_structural_failure() {
        let verifier = SchemaVerifier::new();
        let json_schema = json!({
            "type": "object",
            "properties": { "cognitiveSkill": { "type": "string", "enum": ["Recall", "Application", "Analysis"] } }
        });

        let report = verifier
            .verify(&json!({ "cognitiveSkill": "Synthesis" }), &make_schema(json_schema, vec![]))
            .unwrap();

        assert!(!report.passed);
    }

    // ── RequiredField ─────────────────────────────────────────────────────────

    #[test]
    fn test_required_field_nested_and_indexed() {
        let verifier = SchemaVerifier::new();
        let doc = json!({ "patientProfile": { "name": "Ravi" }, "mcqs": [{ "question": "Why?" }] });
        let schema = make_schema(
            serde_json::Value::Null,
            vec![
                rule("req-name", VerificationRuleType::RequiredField { field_path: "patientProfile.name".to_string() }),
                rule("req-question", VerificationRuleType::RequiredField { field_path: "mcqs.0.question".to_string() }),
            ],
        );

        let report = verifier.verify(&doc, &schema).unwrap();
        assert!(report.passed, "expected pass, failures: {:?}", report.failures);
    }

    #[test]
    fn test_required_field_blank_string_fails() {
        let verifier = SchemaVerifier::new();
        let schema = make_schema(
            serde_json::Value::Null,
            vec![rule("req-title", VerificationRuleType::RequiredField { field_path: "title".to_string() })],
        );

        let report = verifier.verify(&json!({ "title": "   " }), &schema).unwrap();
        assert!(!report.passed);
        assert_eq!(report.failures[0].rule_id, "req-title");

        let report = verifier.verify(&json!({ "title": null }), &schema).unwrap();
        assert!(!report.passed);
        assert!(report.failures[0].message.contains("title"));
    }

    // ── AllowedValues ─────────────────────────────────────────────────────────

    #[test]
    fn test_allowed_values() {
        let verifier = SchemaVerifier::new();
        let schema = make_schema(
            serde_json::Value::Null,
            vec![rule(
                "allowed-specialty",
                VerificationRuleType::AllowedValues {
                    field_path: "tags.specialty".to_string(),
                    allowed: vec![json!("Community Pharmacy"), json!("Hospital Pharmacy")],
                },
            )],
        );

        let ok = verifier
            .verify(&json!({ "tags": { "specialty": "Hospital Pharmacy" } }), &schema)
            .unwrap();
        assert!(ok.passed);

        let bad = verifier
            .verify(&json!({ "tags": { "specialty": "Nuclear Pharmacy" } }), &schema)
            .unwrap();
        assert!(!bad.passed);
        assert!(bad.failures[0].message.contains("tags.specialty"));
    }

    // ── ArrayLength ───────────────────────────────────────────────────────────

    #[test]
    fn test_array_length_bounds_are_inclusive() {
        let verifier = SchemaVerifier::new();
        let schema = make_schema(
            serde_json::Value::Null,
            vec![rule(
                "mcq-count",
                VerificationRuleType::ArrayLength { field_path: "mcqs".to_string(), min: 2, max: 5 },
            )],
        );

        for (n, expect_pass) in [(1, false), (2, true), (5, true), (6, false)] {
            let doc = json!({ "mcqs": vec![json!({}); n] });
            let report = verifier.verify(&doc, &schema).unwrap();
            assert_eq!(report.passed, expect_pass, "{n} mcqs");
        }

        let report = verifier.verify(&json!({ "mcqs": "none" }), &schema).unwrap();
        assert!(!report.passed);
    }

    // ── ExactlyOneFlagged ─────────────────────────────────────────────────────

    #[test]
    fn test_exactly_one_flagged() {
        let verifier = SchemaVerifier::new();
        let schema = make_schema(
            serde_json::Value::Null,
            vec![rule(
                "one-correct",
                VerificationRuleType::ExactlyOneFlagged {
                    field_path: "drugRelatedProblems".to_string(),
                    flag: "isCorrect".to_string(),
                },
            )],
        );

        assert!(verifier.verify(&drps(&[false, true, false, false]), &schema).unwrap().passed);

        let none = verifier.verify(&drps(&[false, false, false, false]), &schema).unwrap();
        assert!(!none.passed);
        assert!(none.failures[0].message.contains("0 entries"));

        let two = verifier.verify(&drps(&[true, true, false, false]), &schema).unwrap();
        assert!(!two.passed);
    }

    // ── Custom rules ──────────────────────────────────────────────────────────

    #[test]
    fn test_custom_rule_registered_and_missing() {
        let mut verifier = SchemaVerifier::new();
        verifier.register_rule(
            "title-not-placeholder",
            Box::new(|doc| {
                (doc.get("title").and_then(|t| t.as_str()) == Some("TBD"))
                    .then(|| "title is a placeholder".to_string())
            }),
        );

        let schema = make_schema(
            serde_json::Value::Null,
            vec![rule(
                "custom-title",
                VerificationRuleType::Custom { function_name: "title-not-placeholder".to_string() },
            )],
        );
        assert!(verifier.verify(&json!({ "title": "Real" }), &schema).unwrap().passed);
        assert!(!verifier.verify(&json!({ "title": "TBD" }), &schema).unwrap().passed);

        let unknown = make_schema(
            serde_json::Value::Null,
            vec![rule("custom-missing", VerificationRuleType::Custom { function_name: "nope".to_string() })],
        );
        let report = verifier.verify(&json!({}), &unknown).unwrap();
        assert!(!report.passed);
        assert!(report.failures[0].message.contains("nope"));
    }

    /// All failures are collected, not just the first.
    #[test]
    fn test_failures_accumulate() {
        let verifier = SchemaVerifier::new();
        let schema = make_schema(
            json!({ "type": "object", "required": ["title"] }),
            vec![
                rule("req-complaint", VerificationRuleType::RequiredField { field_path: "chiefComplaint".to_string() }),
                rule(
                    "one-correct",
                    VerificationRuleType::ExactlyOneFlagged {
                        field_path: "drugRelatedProblems".to_string(),
                        flag: "isCorrect".to_string(),
                    },
                ),
            ],
        );

        let report = verifier.verify(&json!({}), &schema).unwrap();
        assert!(!report.passed);
        assert_eq!(report.failures.len(), 3);
        assert!(report.summary().contains("[req-complaint]"));
    }
}
