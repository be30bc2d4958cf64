//! Output contracts for structured model calls.
//!
//! Each document has two halves: a JSON Schema sent to the model as its
//! response constraint and checked again on the way back, plus semantic rules
//! the schema language cannot express (exactly one correct problem, answer
//! indices inside their own options).

use serde_json::{json, Value};

use pharmsim_contracts::labels::{CognitiveSkill, Epa, Ethnicity, Gender, PharmacyArea, TrainingPhase};
use pharmsim_contracts::verify::{OutputSchema, VerificationRule, VerificationRuleType};
use pharmsim_verify::engine::SchemaVerifier;

pub const CASE_SCHEMA_ID: &str = "pharmacy-case-v1";
pub const DEBRIEF_SCHEMA_ID: &str = "debrief-v1";

/// Custom rule name: every mcq answer index addresses its own options.
pub const MCQ_ANSWER_INDEX_RULE: &str = "mcq-answer-index";

pub const DRP_COUNT: usize = 4;
pub const MCQ_OPTION_COUNT: usize = 4;
pub const MIN_MCQS: usize = 2;
pub const MAX_MCQS: usize = 5;

fn string_enum(labels: Vec<&'static str>) -> Value {
    json!({ "type": "string", "enum": labels })
}

fn non_empty_string() -> Value {
    json!({ "type": "string", "minLength": 1 })
}

/// JSON Schema for a `PharmacyCase` document.
pub fn case_json_schema() -> Value {
    json!({
        "type": "object",
        "required": [
            "title", "patientProfile", "tags", "chiefComplaint", "historyOfPresentIllness",
            "medicationHistory", "physicalExam", "labResults", "drugRelatedProblems", "mcqs",
            "correctProblemExplanation"
        ],
        "properties": {
            "title": non_empty_string(),
            "patientProfile": {
                "type": "object",
                "required": ["name", "age", "gender", "ethnicity"],
                "properties": {
                    "name": non_empty_string(),
                    "age": { "type": "integer", "minimum": 0, "maximum": 120 },
                    "gender": string_enum(Gender::labels()),
                    "ethnicity": string_enum(Ethnicity::labels())
                }
            },
            "tags": {
                "type": "object",
                "required": ["trainingPhase", "specialty", "cognitiveSkill", "epas", "curriculum"],
                "properties": {
                    "trainingPhase": string_enum(TrainingPhase::labels()),
                    "specialty": string_enum(PharmacyArea::labels()),
                    "cognitiveSkill": string_enum(CognitiveSkill::labels()),
                    "epas": { "type": "array", "items": string_enum(Epa::labels()) },
                    "curriculum": {
                        "type": "object",
                        "required": ["framework", "competency"],
                        "properties": {
                            "framework": { "type": "string" },
                            "competency": { "type": "string" }
                        }
                    }
                }
            },
            "chiefComplaint": non_empty_string(),
            "historyOfPresentIllness": { "type": "string" },
            "medicationHistory": { "type": "string" },
            "physicalExam": { "type": "string" },
            "labResults": { "type": "string" },
            "drugRelatedProblems": {
                "type": "array",
                "minItems": DRP_COUNT,
                "maxItems": DRP_COUNT,
                "items": {
                    "type": "object",
                    "required": ["problem", "isCorrect"],
                    "properties": {
                        "problem": non_empty_string(),
                        "isCorrect": { "type": "boolean" }
                    }
                }
            },
            "mcqs": {
                "type": "array",
                "minItems": MIN_MCQS,
                "maxItems": MAX_MCQS,
                "items": {
                    "type": "object",
                    "required": ["question", "options", "correctAnswerIndex", "explanation"],
                    "properties": {
                        "question": non_empty_string(),
                        "options": {
                            "type": "array",
                            "minItems": MCQ_OPTION_COUNT,
                            "maxItems": MCQ_OPTION_COUNT,
                            "items": { "type": "string" }
                        },
                        "correctAnswerIndex": { "type": "integer", "minimum": 0, "maximum": MCQ_OPTION_COUNT - 1 },
                        "explanation": { "type": "string" }
                    }
                }
            },
            "correctProblemExplanation": { "type": "string" }
        }
    })
}

fn rule(id: &str, description: &str, rule_type: VerificationRuleType) -> VerificationRule {
    VerificationRule {
        rule_id: id.to_string(),
        description: description.to_string(),
        rule_type,
    }
}

fn required(id: &str, field_path: &str) -> VerificationRule {
    rule(
        id,
        &format!("{field_path} must be present and non-blank"),
        VerificationRuleType::RequiredField { field_path: field_path.to_string() },
    )
}

fn allowed(id: &str, field_path: &str, labels: Vec<&'static str>) -> VerificationRule {
    rule(
        id,
        &format!("{field_path} must be a known label"),
        VerificationRuleType::AllowedValues {
            field_path: field_path.to_string(),
            allowed: labels.into_iter().map(Value::from).collect(),
        },
    )
}

/// Structural schema plus semantic rules for a generated case.
pub fn case_output_schema() -> OutputSchema {
    OutputSchema {
        schema_id: CASE_SCHEMA_ID.to_string(),
        json_schema: case_json_schema(),
        rules: vec![
            required("req-title", "title"),
            required("req-patient-name", "patientProfile.name"),
            required("req-chief-complaint", "chiefComplaint"),
            required("req-lab-results", "labResults"),
            allowed("enum-training-phase", "tags.trainingPhase", TrainingPhase::labels()),
            allowed("enum-specialty", "tags.specialty", PharmacyArea::labels()),
            allowed("enum-cognitive-skill", "tags.cognitiveSkill", CognitiveSkill::labels()),
            rule(
                "drp-count",
                "exactly four drug-related problems",
                VerificationRuleType::ArrayLength {
                    field_path: "drugRelatedProblems".to_string(),
                    min: DRP_COUNT,
                    max: DRP_COUNT,
                },
            ),
            rule(
                "drp-one-correct",
                "exactly one drug-related problem is flagged correct",
                VerificationRuleType::ExactlyOneFlagged {
                    field_path: "drugRelatedProblems".to_string(),
                    flag: "isCorrect".to_string(),
                },
            ),
            rule(
                "mcq-count",
                "two to five multiple-choice questions",
                VerificationRuleType::ArrayLength {
                    field_path: "mcqs".to_string(),
                    min: MIN_MCQS,
                    max: MAX_MCQS,
                },
            ),
            rule(
                MCQ_ANSWER_INDEX_RULE,
                "each mcq has four options and an answer index inside them",
                VerificationRuleType::Custom { function_name: MCQ_ANSWER_INDEX_RULE.to_string() },
            ),
        ],
    }
}

/// Custom rule body for [`MCQ_ANSWER_INDEX_RULE`].
pub fn check_mcq_answer_index(document: &Value) -> Option<String> {
    let mcqs = document.get("mcqs")?.as_array()?;
    for (i, mcq) in mcqs.iter().enumerate() {
        let options = mcq.get("options").and_then(Value::as_array).map(Vec::len).unwrap_or(0);
        if options != MCQ_OPTION_COUNT {
            return Some(format!("mcqs[{i}] has {options} options, expected {MCQ_OPTION_COUNT}"));
        }
        match mcq.get("correctAnswerIndex").and_then(Value::as_u64) {
            Some(index) if (index as usize) < options => {}
            Some(index) => return Some(format!("mcqs[{i}] answer index {index} is out of range")),
            None => return Some(format!("mcqs[{i}] has no valid answer index")),
        }
    }
    None
}

/// JSON Schema for a `DebriefData` document.
pub fn debrief_json_schema() -> Value {
    json!({
        "type": "object",
        "required": ["stepwiseReasoning", "learningPearls", "citations"],
        "properties": {
            "stepwiseReasoning": non_empty_string(),
            "learningPearls": { "type": "array", "items": { "type": "string" } },
            "citations": { "type": "array", "items": { "type": "string" } }
        }
    })
}

pub fn debrief_output_schema() -> OutputSchema {
    OutputSchema {
        schema_id: DEBRIEF_SCHEMA_ID.to_string(),
        json_schema: debrief_json_schema(),
        rules: vec![required("req-reasoning", "stepwiseReasoning")],
    }
}

/// A verifier with every engine custom rule registered.
pub fn engine_verifier() -> SchemaVerifier {
    let mut verifier = SchemaVerifier::new();
    verifier.register_rule(MCQ_ANSWER_INDEX_RULE, Box::new(check_mcq_answer_index));
    verifier
}
