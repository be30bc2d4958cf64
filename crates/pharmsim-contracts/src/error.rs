//! Error types for the PharmSim simulation pipeline.
//!
//! All fallible operations return `SimResult<T>`. Variants are grouped by the
//! component boundary that raises them, so the session state machine can turn
//! any of them into a message the student can read.

use thiserror::Error;

/// The unified error type for PharmSim.
#[derive(Debug, Error)]
pub enum SimError {
    /// Case creation failed or the model produced an invalid case document.
    #[error("case generation failed: {reason}")]
    Generation { reason: String },

    /// A single chat turn with the simulated patient failed.
    #[error("chat turn failed: {reason}")]
    Chat { reason: String },

    /// The hint request failed. The daily hint budget is not consumed.
    #[error("hint request failed: {reason}")]
    Hint { reason: String },

    /// The debrief request failed upstream.
    #[error("debrief request failed: {reason}")]
    Debrief { reason: String },

    /// The identity backend rejected a request. `reason` is the backend's text, verbatim.
    #[error("{reason}")]
    Auth { reason: String },

    /// Model output could not be parsed as the expected structured document.
    #[error("could not parse model output: {reason}")]
    Parse { reason: String },

    /// The generative-AI backend could not be reached or returned an error status.
    #[error("model backend error: {reason}")]
    Upstream { reason: String },

    /// An operation was requested in a session state that does not allow it.
    #[error("state machine error: {reason}")]
    StateMachine { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// The local key/value store could not be read or written.
    #[error("storage error: {reason}")]
    Storage { reason: String },
}

impl SimError {
    /// Text suitable for showing to the student.
    ///
    /// Internal detail (status codes, parser offsets) is kept out of the
    /// rendered text; it is available through `Display` for logs.
    pub fn user_message(&self) -> String {
        match self {
            SimError::Generation { .. } | SimError::Parse { .. } => {
                "We couldn't generate a valid patient case. Please try again.".to_string()
            }
            SimError::Chat { .. } => {
                "Sorry, the patient couldn't respond just now. Please try sending your message again."
                    .to_string()
            }
            SimError::Hint { .. } => {
                "A hint couldn't be generated right now. Your hint budget was not used.".to_string()
            }
            SimError::Debrief { .. } => {
                "Detailed feedback couldn't be generated for this case.".to_string()
            }
            SimError::Auth { reason } => reason.clone(),
            SimError::Upstream { .. } => {
                "The AI service is unavailable right now. Please try again shortly.".to_string()
            }
            SimError::StateMachine { reason } => reason.clone(),
            SimError::Config { reason } => format!("Configuration problem: {reason}"),
            SimError::Storage { .. } => "Local data could not be saved.".to_string(),
        }
    }
}

/// Convenience alias used throughout the PharmSim crates.
pub type SimResult<T> = Result<T, SimError>;
