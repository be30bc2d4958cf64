//! `SimulationBackend` over a generative model.
//!
//! `AiBackend` is the production wiring of every engine component behind the
//! single trait the `Simulator` talks to.

use std::sync::Arc;

use async_trait::async_trait;

use pharmsim_config::SimConfig;
use pharmsim_contracts::avatar::{PatientAvatar, PresentationGender};
use pharmsim_contracts::case::{PatientProfile, PharmacyCase};
use pharmsim_contracts::chat::ChatMessage;
use pharmsim_contracts::debrief::DebriefReport;
use pharmsim_contracts::error::SimResult;
use pharmsim_contracts::filters::GenerationFilters;
use pharmsim_core::traits::{GenerativeModel, PatientConversation, SimulationBackend};

use crate::avatar::AvatarPicker;
use crate::case_generator::CaseGenerator;
use crate::chat::PatientChat;
use crate::debrief::DebriefGenerator;
use crate::hint::HintGenerator;

/// Model ids and presentation defaults for [`AiBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    /// Used for case, specialty, hint, and debrief requests.
    pub case_model: String,
    pub chat_model: String,
    pub other_gender_presentation: PresentationGender,
}

impl From<&SimConfig> for BackendSettings {
    fn from(config: &SimConfig) -> Self {
        Self {
            case_model: config.model.case_model.clone(),
            chat_model: config.model.chat_model.clone(),
            other_gender_presentation: config.avatar.other_gender_presentation,
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self::from(&SimConfig::default())
    }
}

pub struct AiBackend {
    model: Arc<dyn GenerativeModel>,
    chat_model: String,
    cases: CaseGenerator,
    avatars: AvatarPicker,
    hints: HintGenerator,
    debriefs: DebriefGenerator,
}

impl AiBackend {
    pub fn new(model: Arc<dyn GenerativeModel>, settings: BackendSettings) -> Self {
        Self {
            cases: CaseGenerator::new(model.clone(), settings.case_model.clone()),
            avatars: AvatarPicker::new(settings.other_gender_presentation),
            hints: HintGenerator::new(model.clone(), settings.case_model.clone()),
            debriefs: DebriefGenerator::new(model.clone(), settings.case_model),
            chat_model: settings.chat_model,
            model,
        }
    }
}

#[async_trait]
impl SimulationBackend for AiBackend {
    async fn generate_case(&self, filters: &GenerationFilters) -> SimResult<PharmacyCase> {
        self.cases.generate_case(filters).await
    }

    fn resolve_avatar(&self, profile: &PatientProfile) -> PatientAvatar {
        self.avatars.pick_avatar(profile)
    }

    fn open_conversation(&self, case: &PharmacyCase) -> Arc<dyn PatientConversation> {
        Arc::new(PatientChat::create_session(self.model.clone(), self.chat_model.clone(), case))
    }

    async fn generate_hint(&self, case: &PharmacyCase, transcript: &[ChatMessage]) -> SimResult<String> {
        self.hints.generate_hint(case, transcript).await
    }

    async fn generate_debrief(&self, case: &PharmacyCase, selected_problem: &str) -> SimResult<DebriefReport> {
        self.debriefs.generate_debrief(case, selected_problem).await
    }
}
