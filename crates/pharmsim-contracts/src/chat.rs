//! Chat transcript types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Patient,
    System,
}

/// One entry in a case transcript.
///
/// Transcripts are append-only and ordered by strictly increasing timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp,
        }
    }

    pub fn user(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Sender::User, text, timestamp)
    }

    pub fn patient(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Sender::Patient, text, timestamp)
    }

    pub fn system(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Sender::System, text, timestamp)
    }
}
