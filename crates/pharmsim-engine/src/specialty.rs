//! Practice-area selection for students who picked none.

use std::sync::Arc;

use tracing::{debug, warn};

use pharmsim_contracts::labels::{PharmacyArea, TrainingPhase};
use pharmsim_contracts::model::GenerationRequest;
use pharmsim_core::traits::GenerativeModel;

use crate::prompts::specialty_prompt;

/// The trimmed answer must be exactly one of the four labels.
pub fn parse_specialty(answer: &str) -> Option<PharmacyArea> {
    PharmacyArea::from_label(answer.trim())
}

pub struct SpecialtyPicker {
    model: Arc<dyn GenerativeModel>,
    model_id: String,
}

impl SpecialtyPicker {
    pub fn new(model: Arc<dyn GenerativeModel>, model_id: impl Into<String>) -> Self {
        Self {
            model,
            model_id: model_id.into(),
        }
    }

    /// Ask the model for a practice area. Never fails: any upstream error or
    /// unrecognised answer yields `PharmacyArea::default()`.
    pub async fn pick_specialty(&self, phase: TrainingPhase) -> PharmacyArea {
        let request = GenerationRequest::prompt(&self.model_id, specialty_prompt(phase));
        match self.model.generate(request).await {
            Ok(answer) => match parse_specialty(&answer) {
                Some(area) => {
                    debug!(training_phase = %phase, specialty = %area, "specialty picked");
                    area
                }
                None => {
                    warn!(answer = %answer.trim(), "unrecognised specialty, using default");
                    PharmacyArea::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "specialty request failed, using default");
                PharmacyArea::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pharmsim_contracts::error::SimError;
    use pharmsim_llm::ScriptedModel;

    use super::*;

    async fn pick_with(reply: Result<&str, ()>) -> PharmacyArea {
        let reply = reply
            .map(str::to_string)
            .map_err(|_| SimError::Upstream { reason: "timeout".to_string() });
        let picker = SpecialtyPicker::new(Arc::new(ScriptedModel::with_queue([reply])), "m");
        picker.pick_specialty(TrainingPhase::Year3).await
    }

    #[test]
    fn parse_is_exact_after_trim() {
        assert_eq!(parse_specialty("  Hospital Pharmacy\n"), Some(PharmacyArea::Hospital));
        assert_eq!(parse_specialty("hospital pharmacy"), None);
        assert_eq!(parse_specialty("Hospital Pharmacy."), None);
        assert_eq!(parse_specialty(""), None);
    }

    #[tokio::test]
    async fn valid_answer_is_used() {
        assert_eq!(pick_with(Ok("Clinical Pharmacy")).await, PharmacyArea::Clinical);
    }

    #[tokio::test]
    async fn chatty_answer_falls_back_to_community() {
        assert_eq!(
            pick_with(Ok("I would suggest Clinical Pharmacy.")).await,
            PharmacyArea::Community
        );
    }

    #[tokio::test]
    async fn upstream_error_falls_back_to_community() {
        assert_eq!(pick_with(Err(())).await, PharmacyArea::Community);
    }

    #[tokio::test]
    async fn prompt_names_the_phase() {
        let model = Arc::new(ScriptedModel::with_queue([Ok("Community Pharmacy".to_string())]));
        let picker = SpecialtyPicker::new(model.clone(), "gemini-2.5-flash");
        picker.pick_specialty(TrainingPhase::Year1).await;

        let seen = model.requests();
        assert_eq!(seen[0].model, "gemini-2.5-flash");
        assert!(seen[0].last_user_text().unwrap().contains("B.Pharm Year 1"));
    }
}
