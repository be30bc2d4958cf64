//! Request types for the generative-AI backend.
//!
//! The contract is deliberately small: a model id, an optional system
//! instruction, the conversation turns, and an optional JSON Schema the
//! response must conform to. The backend answers with plain text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTurn {
    pub role: TurnRole,
    pub text: String,
}

impl ModelTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: TurnRole::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: TurnRole::Model, text: text.into() }
    }
}

/// One call to the generative model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Backend model identifier, e.g. "gemini-2.5-flash".
    pub model: String,
    pub system_instruction: Option<String>,
    /// Conversation so far; a single-prompt request has one user turn.
    pub turns: Vec<ModelTurn>,
    /// JSON Schema the response must conform to. `None` means free text.
    pub response_schema: Option<Value>,
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    /// A single-turn request.
    pub fn prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            turns: vec![ModelTurn::user(prompt)],
            response_schema: None,
            temperature: None,
        }
    }

    /// A multi-turn request over an existing conversation.
    pub fn conversation(model: impl Into<String>, turns: Vec<ModelTurn>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            turns,
            response_schema: None,
            temperature: None,
        }
    }

    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Text of the last user turn, if any.
    pub fn last_user_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::User)
            .map(|t| t.text.as_str())
    }
}
