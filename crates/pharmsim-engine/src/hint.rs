//! Socratic hints.

use std::sync::Arc;

use tracing::{debug, warn};

use pharmsim_contracts::case::PharmacyCase;
use pharmsim_contracts::chat::ChatMessage;
use pharmsim_contracts::error::{SimError, SimResult};
use pharmsim_contracts::model::GenerationRequest;
use pharmsim_core::traits::GenerativeModel;

use crate::prompts::hint_prompt;

pub struct HintGenerator {
    model: Arc<dyn GenerativeModel>,
    model_id: String,
}

impl HintGenerator {
    pub fn new(model: Arc<dyn GenerativeModel>, model_id: impl Into<String>) -> Self {
        Self {
            model,
            model_id: model_id.into(),
        }
    }

    /// One hint for the student. Budget accounting is the caller's job.
    pub async fn generate_hint(&self, case: &PharmacyCase, transcript: &[ChatMessage]) -> SimResult<String> {
        let request = GenerationRequest::prompt(&self.model_id, hint_prompt(case, transcript));
        let hint = self
            .model
            .generate(request)
            .await
            .map_err(|e| SimError::Hint { reason: e.to_string() })?;

        let hint = hint.trim();
        if hint.is_empty() {
            return Err(SimError::Hint {
                reason: "the model returned an empty hint".to_string(),
            });
        }
        if reveals_answer(case, hint) {
            warn!(case_title = %case.title, "hint revealed the correct problem, discarded");
            return Err(SimError::Hint {
                reason: "the hint revealed the answer".to_string(),
            });
        }

        debug!(case_title = %case.title, transcript_len = transcript.len(), "hint generated");
        Ok(hint.to_string())
    }
}

/// True when `hint` quotes the correct drug-related problem (ignoring case).
pub fn reveals_answer(case: &PharmacyCase, hint: &str) -> bool {
    case.correct_problem()
        .map(|p| p.problem.trim().to_lowercase())
        .filter(|answer| !answer.is_empty())
        .is_some_and(|answer| hint.to_lowercase().contains(&answer))
}

#[cfg(test)]
mod tests {
    use pharmsim_llm::ScriptedModel;

    use super::*;
    use crate::fixtures::{sample_case, SAMPLE_CORRECT_PROBLEM};

    async fn hint_from(reply: SimResult<String>) -> SimResult<String> {
        let generator = HintGenerator::new(Arc::new(ScriptedModel::with_queue([reply])), "m");
        generator.generate_hint(&sample_case().unwrap(), &[]).await
    }

    #[tokio::test]
    async fn hint_is_trimmed() {
        let hint = hint_from(Ok("  What else did she start recently?\n".to_string())).await.unwrap();
        assert_eq!(hint, "What else did she start recently?");
    }

    #[tokio::test]
    async fn revealing_hint_is_rejected() {
        let reply = format!("The answer is: {}.", SAMPLE_CORRECT_PROBLEM.to_uppercase());
        assert!(matches!(hint_from(Ok(reply)).await, Err(SimError::Hint { .. })));
    }

    #[tokio::test]
    async fn upstream_error_is_hint_error() {
        let result = hint_from(Err(SimError::Upstream { reason: "429".to_string() })).await;
        assert!(matches!(result, Err(SimError::Hint { .. })));
        assert!(matches!(hint_from(Ok(String::new())).await, Err(SimError::Hint { .. })));
    }
}
