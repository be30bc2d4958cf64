//! Case generation: filters → prompt → structured model call → verified case.
//!
//! Pipeline for one request:
//!   1. Resolve the practice area (the specialty picker runs when the student
//!      selected none)
//!   2. Build the prompt and attach the case JSON Schema as the output constraint
//!   3. Strip fences and parse the reply as JSON
//!   4. Verify the document (schema, cardinality, exactly-one-correct, mcq indices)
//!   5. Deserialize into `PharmacyCase`, pin the tags to the request and
//!      backfill missing lab lines
//!
//! Any failure in steps 2–5 is a `SimError::Generation`; a partially
//! populated case is never returned.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use pharmsim_contracts::case::{CaseTags, PharmacyCase};
use pharmsim_contracts::error::{SimError, SimResult};
use pharmsim_contracts::filters::GenerationFilters;
use pharmsim_contracts::labels::PharmacyArea;
use pharmsim_contracts::model::GenerationRequest;
use pharmsim_contracts::verify::OutputSchema;
use pharmsim_core::traits::{GenerativeModel, Verifier};
use pharmsim_verify::clinical_text::{ensure_lab_coverage, missing_investigations};
use pharmsim_verify::json::try_parse_model_json;

use crate::prompts::{case_prompt, CASE_SYSTEM_INSTRUCTION};
use crate::schema::{case_output_schema, engine_verifier};
use crate::specialty::SpecialtyPicker;

fn generation_error(reason: impl Into<String>) -> SimError {
    SimError::Generation { reason: reason.into() }
}

pub struct CaseGenerator {
    model: Arc<dyn GenerativeModel>,
    model_id: String,
    specialties: SpecialtyPicker,
    verifier: Arc<dyn Verifier>,
    schema: OutputSchema,
}

impl CaseGenerator {
    pub fn new(model: Arc<dyn GenerativeModel>, model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        Self {
            specialties: SpecialtyPicker::new(model.clone(), model_id.clone()),
            model,
            model_id,
            verifier: Arc::new(engine_verifier()),
            schema: case_output_schema(),
        }
    }

    pub async fn generate_case(&self, filters: &GenerationFilters) -> SimResult<PharmacyCase> {
        let specialty = match filters.specialties.iter().next() {
            Some(area) => *area,
            None => self.specialties.pick_specialty(filters.training_phase).await,
        };

        let request = GenerationRequest::prompt(&self.model_id, case_prompt(filters, specialty))
            .with_system(CASE_SYSTEM_INSTRUCTION)
            .with_schema(self.schema.json_schema.clone());

        let raw = self
            .model
            .generate(request)
            .await
            .map_err(|e| generation_error(e.to_string()))?;

        let document: Value = try_parse_model_json(&raw).map_err(|e| {
            warn!(error = %e, raw_len = raw.len(), "case reply is not JSON");
            generation_error(e.to_string())
        })?;

        let report = self.verifier.verify(&document, &self.schema)?;
        if !report.passed {
            warn!(failure_count = report.failures.len(), "generated case failed verification");
            return Err(generation_error(report.summary()));
        }

        let mut case: PharmacyCase = serde_json::from_value(document)
            .map_err(|e| generation_error(format!("case document does not match the case model: {e}")))?;

        pin_requested_tags(&mut case.tags, filters, specialty);

        let missing = missing_investigations(&case.lab_results);
        if !missing.is_empty() {
            warn!(case_title = %case.title, missing = ?missing, "backfilling lab results");
            case.lab_results = ensure_lab_coverage(&case.lab_results);
        }

        info!(
            case_title = %case.title,
            specialty = %case.tags.specialty,
            training_phase = %case.tags.training_phase,
            "case generated"
        );
        Ok(case)
    }
}

/// Overwrite tags the model drifted on.
///
/// The phase must be the requested one. The specialty must be one the student
/// selected, or the picked one when none was selected. Regeneration narrows
/// from these tags, so a drifted tag would leak into the next case.
fn pin_requested_tags(tags: &mut CaseTags, filters: &GenerationFilters, specialty: PharmacyArea) {
    if tags.training_phase != filters.training_phase {
        warn!(
            requested = %filters.training_phase,
            returned = %tags.training_phase,
            "case tagged with another training phase, overriding"
        );
        tags.training_phase = filters.training_phase;
    }

    let allowed = if filters.specialties.is_empty() {
        tags.specialty == specialty
    } else {
        filters.specialties.contains(&tags.specialty)
    };
    if !allowed {
        warn!(
            requested = %specialty,
            returned = %tags.specialty,
            "case tagged with an unrequested specialty, overriding"
        );
        tags.specialty = specialty;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use pharmsim_contracts::catalog::INVESTIGATIONS;
    use pharmsim_contracts::labels::{Epa, PharmacyArea, TrainingPhase};
    use pharmsim_llm::ScriptedModel;
    use pharmsim_verify::clinical_text::parse_complex_lab_result;

    use super::*;
    use crate::fixtures::{classify, offline_reply, sample_case_json, RequestKind};

    fn filters() -> GenerationFilters {
        GenerationFilters::new(TrainingPhase::Year2)
            .with_specialty(PharmacyArea::Community)
            .with_epa(Epa::PatientCounseling)
    }

    fn generator_replying(reply: SimResult<String>) -> (Arc<ScriptedModel>, CaseGenerator) {
        let model = Arc::new(ScriptedModel::with_queue([reply]));
        let generator = CaseGenerator::new(model.clone(), "gemini-2.5-flash");
        (model, generator)
    }

    fn expect_generation_error(result: SimResult<PharmacyCase>) -> String {
        match result {
            Err(SimError::Generation { reason }) => reason,
            other => panic!("expected Generation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn fenced_case_is_parsed_and_verified() {
        let raw = format!("```json\n{}\n```", sample_case_json());
        let (model, generator) = generator_replying(Ok(raw));

        let case = generator.generate_case(&filters()).await.unwrap();

        assert_eq!(case.drug_related_problems.len(), 4);
        assert_eq!(case.drug_related_problems.iter().filter(|p| p.is_correct).count(), 1);
        for mcq in &case.mcqs {
            assert_eq!(mcq.options.len(), 4);
            assert!(mcq.correct_answer_index < mcq.options.len());
        }

        let request = &model.requests()[0];
        assert!(request.response_schema.is_some());
        assert_eq!(request.system_instruction.as_deref(), Some(CASE_SYSTEM_INSTRUCTION));
    }

    #[tokio::test]
    async fn missing_labs_are_backfilled() {
        let (_, generator) = generator_replying(Ok(sample_case_json().to_string()));
        let case = generator.generate_case(&filters()).await.unwrap();

        assert_eq!(parse_complex_lab_result(&case.lab_results, "INR"), "4.6");
        assert_eq!(parse_complex_lab_result(&case.lab_results, "ECG"), "Not available");
        for name in INVESTIGATIONS {
            assert_ne!(
                parse_complex_lab_result(&case.lab_results, name),
                pharmsim_contracts::catalog::RESULT_NOT_AVAILABLE,
                "{name} has no line"
            );
        }
    }

    #[tokio::test]
    async fn upstream_failure_is_generation_error() {
        let (_, generator) = generator_replying(Err(SimError::Upstream { reason: "HTTP 503".to_string() }));
        let reason = expect_generation_error(generator.generate_case(&filters()).await);
        assert!(reason.contains("503"));
    }

    #[tokio::test]
    async fn prose_reply_is_generation_error() {
        let (_, generator) = generator_replying(Ok("Sorry, I cannot help with that.".to_string()));
        expect_generation_error(generator.generate_case(&filters()).await);
    }

    #[tokio::test]
    async fn two_correct_problems_are_rejected() {
        let mut doc = sample_case_json();
        doc["drugRelatedProblems"][2]["isCorrect"] = json!(true);
        let (_, generator) = generator_replying(Ok(doc.to_string()));

        let reason = expect_generation_error(generator.generate_case(&filters()).await);
        assert!(reason.contains("drp-one-correct"));
    }

    #[tokio::test]
    async fn missing_title_is_rejected() {
        let mut doc = sample_case_json();
        doc["title"] = json!("   ");
        let (_, generator) = generator_replying(Ok(doc.to_string()));
        expect_generation_error(generator.generate_case(&filters()).await);
    }

    #[tokio::test]
    async fn drifted_tags_are_pinned_to_the_request() {
        // Sample case is tagged Year 2 / Community.
        let (_, generator) = generator_replying(Ok(sample_case_json().to_string()));
        let filters = GenerationFilters::new(TrainingPhase::Year4).with_specialty(PharmacyArea::Hospital);

        let case = generator.generate_case(&filters).await.unwrap();

        assert_eq!(case.tags.training_phase, TrainingPhase::Year4);
        assert_eq!(case.tags.specialty, PharmacyArea::Hospital);
    }

    #[tokio::test]
    async fn tag_among_several_selected_specialties_is_kept() {
        let (_, generator) = generator_replying(Ok(sample_case_json().to_string()));
        let filters = GenerationFilters::new(TrainingPhase::Year2)
            .with_specialty(PharmacyArea::Hospital)
            .with_specialty(PharmacyArea::Community);

        let case = generator.generate_case(&filters).await.unwrap();

        assert_eq!(case.tags.specialty, PharmacyArea::Community);
    }

    #[tokio::test]
    async fn picked_specialty_wins_over_drifted_tag() {
        let model = Arc::new(ScriptedModel::with_responder(|req| match classify(req) {
            RequestKind::Specialty => Ok("Hospital Pharmacy".to_string()),
            _ => Ok(sample_case_json().to_string()),
        }));
        let generator = CaseGenerator::new(model, "m");

        let case = generator
            .generate_case(&GenerationFilters::new(TrainingPhase::Year2))
            .await
            .unwrap();

        assert_eq!(case.tags.specialty, PharmacyArea::Hospital);
    }

    #[tokio::test]
    async fn no_specialty_runs_the_picker_first() {
        let model = Arc::new(ScriptedModel::with_responder(|req| match classify(req) {
            RequestKind::Specialty => Ok("Hospital Pharmacy".to_string()),
            _ => offline_reply(req),
        }));
        let generator = CaseGenerator::new(model.clone(), "m");

        generator
            .generate_case(&GenerationFilters::new(TrainingPhase::Year3))
            .await
            .unwrap();

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(classify(&requests[0]), RequestKind::Specialty);
        assert!(requests[1].last_user_text().unwrap().contains("Hospital Pharmacy"));
    }
}
