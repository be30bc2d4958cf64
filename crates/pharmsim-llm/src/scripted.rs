//! A deterministic `GenerativeModel` for offline runs and tests.
//!
//! Answers come either from a queue (one per call, in order) or from a
//! responder closure that sees the full request. Every request is recorded.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use pharmsim_contracts::error::{SimError, SimResult};
use pharmsim_contracts::model::GenerationRequest;
use pharmsim_core::traits::GenerativeModel;

pub type Responder = Box<dyn Fn(&GenerationRequest) -> SimResult<String> + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<SimResult<String>>>),
    Responder(Responder),
}

pub struct ScriptedModel {
    script: Script,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    /// Replies are consumed in order; an exhausted queue is an `Upstream` error.
    pub fn with_queue(replies: impl IntoIterator<Item = SimResult<String>>) -> Self {
        Self {
            script: Script::Queue(Mutex::new(replies.into_iter().collect())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_responder(
        responder: impl Fn(&GenerationRequest) -> SimResult<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Script::Responder(Box::new(responder)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request seen so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, request: GenerationRequest) -> SimResult<String> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }

        match &self.script {
            Script::Responder(respond) => respond(&request),
            Script::Queue(queue) => {
                let next = queue.lock().ok().and_then(|mut q| q.pop_front());
                next.unwrap_or_else(|| {
                    Err(SimError::Upstream {
                        reason: "scripted model has no replies left".to_string(),
                    })
                })
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queue_replies_in_order_then_errors() {
        let model = ScriptedModel::with_queue([
            Ok("first".to_string()),
            Err(SimError::Upstream { reason: "503".to_string() }),
        ]);

        assert_eq!(model.generate(GenerationRequest::prompt("m", "a")).await.unwrap(), "first");
        assert!(model.generate(GenerationRequest::prompt("m", "b")).await.is_err());
        assert!(matches!(
            model.generate(GenerationRequest::prompt("m", "c")).await,
            Err(SimError::Upstream { .. })
        ));
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn responder_sees_request_and_requests_are_recorded() {
        let model = ScriptedModel::with_responder(|req| {
            Ok(format!("echo: {}", req.last_user_text().unwrap_or_default()))
        });

        let reply = model
            .generate(GenerationRequest::prompt("m", "hello").with_system("be brief"))
            .await
            .unwrap();

        assert_eq!(reply, "echo: hello");
        let seen = model.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].system_instruction.as_deref(), Some("be brief"));
    }
}
