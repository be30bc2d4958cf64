//! Post-case feedback.
//!
//! An upstream failure is a `SimError::Debrief`. Output that arrives but cannot
//! be used (not JSON, fails the schema, or empty) becomes the fallback report
//! with a visible notice instead.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use pharmsim_contracts::case::PharmacyCase;
use pharmsim_contracts::debrief::{DebriefData, DebriefReport};
use pharmsim_contracts::error::{SimError, SimResult};
use pharmsim_contracts::model::GenerationRequest;
use pharmsim_contracts::verify::OutputSchema;
use pharmsim_core::traits::{GenerativeModel, Verifier};
use pharmsim_verify::json::parse_model_json;

use crate::prompts::{debrief_prompt, DEBRIEF_SYSTEM_INSTRUCTION};
use crate::schema::{debrief_output_schema, engine_verifier};

/// Shown above the fallback debrief.
pub const DEGRADED_NOTICE: &str =
    "Detailed feedback for this case came back in an unexpected format, so general guidance is shown instead.";

pub struct DebriefGenerator {
    model: Arc<dyn GenerativeModel>,
    model_id: String,
    verifier: Arc<dyn Verifier>,
    schema: OutputSchema,
}

impl DebriefGenerator {
    pub fn new(model: Arc<dyn GenerativeModel>, model_id: impl Into<String>) -> Self {
        Self {
            model,
            model_id: model_id.into(),
            verifier: Arc::new(engine_verifier()),
            schema: debrief_output_schema(),
        }
    }

    pub async fn generate_debrief(&self, case: &PharmacyCase, selected_problem: &str) -> SimResult<DebriefReport> {
        let request = GenerationRequest::prompt(&self.model_id, debrief_prompt(case, selected_problem))
            .with_system(DEBRIEF_SYSTEM_INSTRUCTION)
            .with_schema(self.schema.json_schema.clone());

        let raw = self
            .model
            .generate(request)
            .await
            .map_err(|e| SimError::Debrief { reason: e.to_string() })?;

        let report = self.to_report(&raw);
        info!(
            case_title = %case.title,
            degraded = report.is_degraded(),
            pearls = report.data.learning_pearls.len(),
            "debrief generated"
        );
        Ok(report)
    }

    fn to_report(&self, raw: &str) -> DebriefReport {
        let document: Value = parse_model_json(raw, Value::Null);

        match self.verifier.verify(&document, &self.schema) {
            Ok(report) if report.passed => {}
            Ok(report) => {
                warn!(failures = %report.summary(), "debrief failed verification");
                return DebriefReport::degraded(DEGRADED_NOTICE);
            }
            Err(e) => {
                warn!(error = %e, "debrief could not be verified");
                return DebriefReport::degraded(DEGRADED_NOTICE);
            }
        }

        match serde_json::from_value::<DebriefData>(document) {
            Ok(data) if !data.is_empty() => DebriefReport::complete(data),
            Ok(_) => DebriefReport::degraded(DEGRADED_NOTICE),
            Err(e) => {
                warn!(error = %e, "debrief document does not match the debrief model");
                DebriefReport::degraded(DEGRADED_NOTICE)
            }
        }
    }
}
