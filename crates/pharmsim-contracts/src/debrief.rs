//! Submission result and debrief types.

use serde::{Deserialize, Serialize};

/// The outcome of the student submitting a drug-related problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub problem_correct: bool,
    /// Whole seconds between the case becoming ready and submission.
    pub time_taken: u64,
    pub selected_problem: String,
}

/// Structured post-case feedback.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebriefData {
    pub stepwise_reasoning: String,
    #[serde(default)]
    pub learning_pearls: Vec<String>,
    #[serde(default)]
    pub citations: Vec<String>,
}

impl DebriefData {
    /// Reasoning text used when the model's debrief is unusable.
    pub const FALLBACK_REASONING: &'static str =
        "Detailed reasoning could not be generated for this case. Review the case explanation and discuss it with your instructor.";

    /// Empty-but-valid content shown in place of a malformed debrief.
    pub fn fallback() -> Self {
        Self {
            stepwise_reasoning: Self::FALLBACK_REASONING.to_string(),
            learning_pearls: Vec::new(),
            citations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stepwise_reasoning.trim().is_empty()
            && self.learning_pearls.is_empty()
            && self.citations.is_empty()
    }
}

/// Debrief content plus an optional notice that it is degraded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebriefReport {
    pub data: DebriefData,
    /// Set when `data` is the fallback rather than model output.
    pub notice: Option<String>,
}

impl DebriefReport {
    pub fn complete(data: DebriefData) -> Self {
        Self { data, notice: None }
    }

    pub fn degraded(notice: impl Into<String>) -> Self {
        Self {
            data: DebriefData::fallback(),
            notice: Some(notice.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.notice.is_some()
    }
}
