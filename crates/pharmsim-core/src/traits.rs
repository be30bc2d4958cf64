//! Collaborator trait definitions for the PharmSim session pipeline.
//!
//! The simulator never talks to a network service or a disk directly. Every
//! outside capability is one of these traits, injected at construction:
//!
//! - `GenerativeModel`    : the raw text-in/text-out AI backend
//! - `SimulationBackend`  : case, avatar, chat, hint, and debrief generation
//! - `PatientConversation`: one live chat session with the simulated patient
//! - `Verifier`           : structural and semantic checks on model JSON
//! - `KeyValueStore`      : the local persistent store
//! - `SpeechSynthesizer`  : optional text-to-speech
//! - `IdentityBackend` / `ProfileStore`: accounts and notifications
//! - `Clock`              : the time source, replaceable in tests

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde_json::Value;

use pharmsim_contracts::{
    account::{AuthSession, Notification, PendingVerification, Profile},
    avatar::{PatientAvatar, PresentationGender},
    case::{PatientProfile, PharmacyCase},
    chat::ChatMessage,
    debrief::DebriefReport,
    error::SimResult,
    filters::GenerationFilters,
    labels::TrainingPhase,
    model::GenerationRequest,
    verify::{OutputSchema, VerificationReport},
};

/// A generative-AI backend.
///
/// Implementations are **untrusted**: the text they return may be malformed,
/// fence-wrapped, or off-schema. Callers always parse and verify it.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Send one request and return the raw response text.
    ///
    /// Transport and HTTP failures map to `SimError::Upstream`.
    async fn generate(&self, request: GenerationRequest) -> SimResult<String>;

    /// Short provider name for logs.
    fn name(&self) -> &str;
}

/// One chat session with the simulated patient.
///
/// The session owns its dialogue context. Callers only supply new user turns
/// and read replies. Implementations serialize concurrent `send` calls.
#[async_trait]
pub trait PatientConversation: Send + Sync {
    /// Send a user turn and return the patient's reply.
    ///
    /// Fails with `SimError::Chat`; the session remains usable afterwards.
    async fn send(&self, message: &str) -> SimResult<String>;
}

/// Everything the simulator needs from the AI layer.
#[async_trait]
pub trait SimulationBackend: Send + Sync {
    /// Produce a fully verified case. Never returns a partial case.
    async fn generate_case(&self, filters: &GenerationFilters) -> SimResult<PharmacyCase>;

    /// Deterministic persona for a patient.
    fn resolve_avatar(&self, profile: &PatientProfile) -> PatientAvatar;

    /// Start a chat session seeded with the case's persona.
    fn open_conversation(&self, case: &PharmacyCase) -> Arc<dyn PatientConversation>;

    /// A single Socratic hint. Performs no quota logic.
    async fn generate_hint(&self, case: &PharmacyCase, transcript: &[ChatMessage]) -> SimResult<String>;

    /// Structured feedback for a submitted answer.
    ///
    /// Unusable model output yields a degraded report, not an error. Only an
    /// upstream failure returns `SimError::Debrief`.
    async fn generate_debrief(&self, case: &PharmacyCase, selected_problem: &str) -> SimResult<DebriefReport>;
}

/// Checks a model document against an `OutputSchema`.
///
/// Implementations are **trusted** and must not call the model. A failing
/// report keeps the document from being deserialized into a typed object.
pub trait Verifier: Send + Sync {
    fn verify(&self, document: &Value, schema: &OutputSchema) -> SimResult<VerificationReport>;
}

/// A string key/value store with last-write-wins semantics.
pub trait KeyValueStore: Send + Sync {
    /// `Ok(None)` when the key was never written or has been removed.
    fn get(&self, key: &str) -> SimResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> SimResult<()>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> SimResult<()>;
}

/// A synthesized utterance, ready to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Text-to-speech. `None` means "render silently", never an error.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: PresentationGender) -> Option<AudioClip>;
}

/// The default synthesizer when no speech vendor is configured.
pub struct SilentSpeech;

#[async_trait]
impl SpeechSynthesizer for SilentSpeech {
    async fn synthesize(&self, _text: &str, _voice: PresentationGender) -> Option<AudioClip> {
        None
    }
}

/// The identity/session backend. Error text is surfaced verbatim as `SimError::Auth`.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> SimResult<PendingVerification>;

    async fn sign_in(&self, email: &str, password: &str) -> SimResult<AuthSession>;

    async fn sign_out(&self) -> SimResult<()>;

    /// Update the "training phase" user-metadata field and return the refreshed session.
    async fn update_training_phase(&self, phase: TrainingPhase) -> SimResult<AuthSession>;
}

/// Profile and notification storage keyed by user id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> SimResult<Profile>;

    /// Newest first.
    async fn fetch_notifications(&self, user_id: &str) -> SimResult<Vec<Notification>>;

    async fn mark_read(&self, notification_id: &str, user_id: &str) -> SimResult<bool>;

    async fn mark_all_read(&self, user_id: &str) -> SimResult<bool>;
}

/// Time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The student's local calendar day. Hint budgets reset at local midnight.
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
