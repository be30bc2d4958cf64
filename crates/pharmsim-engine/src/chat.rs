//! The simulated-patient chat session.
//!
//! A session owns its model-side history. The persona is fixed at creation
//! and sent as the system instruction on every turn. Turns are serialised by
//! an async mutex held across the model call, so a second `send` waits for
//! the first to finish.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use pharmsim_contracts::case::PharmacyCase;
use pharmsim_contracts::error::{SimError, SimResult};
use pharmsim_contracts::model::{GenerationRequest, ModelTurn};
use pharmsim_core::traits::{GenerativeModel, PatientConversation};

use crate::prompts::patient_persona;

pub struct PatientChat {
    model: Arc<dyn GenerativeModel>,
    model_id: String,
    case_title: String,
    persona: String,
    history: Mutex<Vec<ModelTurn>>,
}

impl PatientChat {
    /// Open a session seeded with the patient persona for `case`.
    pub fn create_session(model: Arc<dyn GenerativeModel>, model_id: impl Into<String>, case: &PharmacyCase) -> Self {
        Self {
            model,
            model_id: model_id.into(),
            case_title: case.title.clone(),
            persona: patient_persona(case),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    /// Completed turns, oldest first.
    pub async fn history(&self) -> Vec<ModelTurn> {
        self.history.lock().await.clone()
    }

    /// Send one student message and return the patient's reply.
    ///
    /// On failure the student's turn is removed again, so the model context
    /// only ever holds complete exchanges.
    pub async fn send(&self, message: &str) -> SimResult<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(SimError::Chat {
                reason: "message is empty".to_string(),
            });
        }

        let mut history = self.history.lock().await;
        history.push(ModelTurn::user(message));

        let request = GenerationRequest::conversation(&self.model_id, history.clone()).with_system(&self.persona);
        let reply = match self.model.generate(request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                history.pop();
                warn!(case_title = %self.case_title, "patient reply was empty");
                return Err(SimError::Chat {
                    reason: "the patient reply was empty".to_string(),
                });
            }
            Err(e) => {
                history.pop();
                warn!(case_title = %self.case_title, error = %e, "chat turn failed, rolled back");
                return Err(SimError::Chat { reason: e.to_string() });
            }
        };

        history.push(ModelTurn::model(&reply));
        debug!(case_title = %self.case_title, turns = history.len(), "chat turn complete");
        Ok(reply)
    }
}

#[async_trait]
impl PatientConversation for PatientChat {
    async fn send(&self, message: &str) -> SimResult<String> {
        PatientChat::send(self, message).await
    }
}

#[cfg(test)]
mod tests {
    use pharmsim_contracts::model::TurnRole;
    use pharmsim_llm::ScriptedModel;

    use super::*;
    use crate::fixtures::sample_case;

    fn session(replies: Vec<SimResult<String>>) -> (Arc<ScriptedModel>, PatientChat) {
        let model = Arc::new(ScriptedModel::with_queue(replies));
        let chat = PatientChat::create_session(model.clone(), "m", &sample_case().unwrap());
        (model, chat)
    }

    #[tokio::test]
    async fn history_accumulates_and_persona_is_sent_each_turn() {
        let (model, chat) = session(vec![Ok("My knee hurts.".to_string()), Ok("Warfarin.".to_string())]);

        assert_eq!(chat.send("Why are you here?").await.unwrap(), "My knee hurts.");
        assert_eq!(chat.send("What do you take?").await.unwrap(), "Warfarin.");

        let history = chat.history().await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[3].role, TurnRole::Model);

        let requests = model.requests();
        assert_eq!(requests[1].turns.len(), 3);
        assert!(requests.iter().all(|r| r.system_instruction.as_deref() == Some(chat.persona())));
    }

    #[tokio::test]
    async fn failed_turn_is_rolled_back() {
        let (model, chat) = session(vec![
            Ok("Hello.".to_string()),
            Err(SimError::Upstream { reason: "timeout".to_string() }),
            Ok("I take warfarin.".to_string()),
        ]);

        chat.send("Hi").await.unwrap();
        assert!(matches!(chat.send("Any medicines?").await, Err(SimError::Chat { .. })));
        assert_eq!(chat.history().await.len(), 2);

        chat.send("Any medicines?").await.unwrap();
        let last = model.requests().pop().unwrap();
        assert_eq!(last.turns.len(), 3);
        assert_eq!(last.turns[1].role, TurnRole::Model);
    }

    #[tokio::test]
    async fn empty_reply_and_empty_message_are_chat_errors() {
        let (model, chat) = session(vec![Ok("   ".to_string())]);
        assert!(matches!(chat.send("  ").await, Err(SimError::Chat { .. })));
        assert_eq!(model.call_count(), 0);

        assert!(matches!(chat.send("Hello?").await, Err(SimError::Chat { .. })));
        assert!(chat.history().await.is_empty());
    }
}
