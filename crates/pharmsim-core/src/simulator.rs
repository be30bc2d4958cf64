//! The PharmSim session state machine.
//!
//! The simulator drives one student through the lifecycle:
//!
//!   Idle → Generating → InSimulation → Debriefing → Idle
//!
//! Every slow step (case generation, a chat turn, a debrief) is split into
//! three parts so the caller never holds the state across a network call:
//!
//! 1. `begin_*` validates the current state, records a ticket, and returns a job
//! 2. `job.run().await` talks to the backend without touching the simulator
//! 3. `apply_*` publishes the outcome only if its ticket is still current
//!
//! A result whose ticket no longer matches (the student went home, asked for
//! another case, or submitted) is dropped. The `start_generation`,
//! `send_message`, and `submit_and_debrief` helpers run all three parts in order.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use pharmsim_contracts::{
    avatar::{PatientAvatar, PresentationGender},
    case::PharmacyCase,
    catalog::INVESTIGATIONS,
    chat::ChatMessage,
    debrief::{DebriefReport, SimulationResult},
    error::{SimError, SimResult},
    filters::GenerationFilters,
};

use crate::persist::{HintLedger, TranscriptLog, DEFAULT_DAILY_HINTS};
use crate::traits::{
    AudioClip, Clock, KeyValueStore, PatientConversation, SilentSpeech, SimulationBackend,
    SpeechSynthesizer, SystemClock,
};

// ── State ────────────────────────────────────────────────────────────────────

/// Coarse phase, for display and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Generating,
    InSimulation,
    Debriefing,
}

/// The application state shared by every screen.
#[derive(Debug)]
pub enum AppState {
    /// The home screen. `notice` carries the last failure, if any.
    Idle { notice: Option<String> },
    Generating { ticket: u64, filters: GenerationFilters },
    InSimulation(Box<ActiveSimulation>),
    Debriefing(Box<DebriefView>),
}

impl AppState {
    pub fn phase(&self) -> Phase {
        match self {
            AppState::Idle { .. } => Phase::Idle,
            AppState::Generating { .. } => Phase::Generating,
            AppState::InSimulation(_) => Phase::InSimulation,
            AppState::Debriefing(_) => Phase::Debriefing,
        }
    }
}

/// A live case the student is working on.
pub struct ActiveSimulation {
    pub case: PharmacyCase,
    pub avatar: PatientAvatar,
    pub transcript: Vec<ChatMessage>,
    /// Catalog names, in the order they were ordered.
    pub ordered_investigations: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub hints_remaining: u32,
    pub last_hint: Option<String>,
    /// True while a chat turn is outstanding.
    pub patient_typing: bool,
    /// Speech for the latest patient reply, until played or superseded.
    pub pending_audio: Option<AudioClip>,
    conversation: Arc<dyn PatientConversation>,
    turn_ticket: Option<u64>,
}

impl fmt::Debug for ActiveSimulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSimulation")
            .field("case_title", &self.case.title)
            .field("avatar", &self.avatar)
            .field("messages", &self.transcript.len())
            .field("ordered_investigations", &self.ordered_investigations)
            .field("hints_remaining", &self.hints_remaining)
            .field("patient_typing", &self.patient_typing)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebriefStatus {
    Loading,
    Ready(DebriefReport),
}

/// The debrief page: the graded result plus feedback that may still be loading.
#[derive(Debug)]
pub struct DebriefView {
    pub case: PharmacyCase,
    pub result: SimulationResult,
    pub status: DebriefStatus,
    ticket: u64,
}

// ── Jobs ─────────────────────────────────────────────────────────────────────

/// A case plus everything that must be ready before it is shown.
pub struct PreparedCase {
    pub case: PharmacyCase,
    pub avatar: PatientAvatar,
    conversation: Arc<dyn PatientConversation>,
}

pub struct GenerationJob {
    ticket: u64,
    filters: GenerationFilters,
    backend: Arc<dyn SimulationBackend>,
}

pub struct GenerationOutcome {
    ticket: u64,
    result: SimResult<PreparedCase>,
}

impl GenerationJob {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn filters(&self) -> &GenerationFilters {
        &self.filters
    }

    /// Generate the case, then resolve its avatar and open the chat session.
    pub async fn run(self) -> GenerationOutcome {
        let result = prepare_case(self.backend.as_ref(), &self.filters).await;
        GenerationOutcome {
            ticket: self.ticket,
            result,
        }
    }
}

async fn prepare_case(backend: &dyn SimulationBackend, filters: &GenerationFilters) -> SimResult<PreparedCase> {
    let case = backend.generate_case(filters).await?;
    if case.correct_problem().is_none() {
        return Err(SimError::Generation {
            reason: "case does not flag exactly one correct drug-related problem".to_string(),
        });
    }
    let avatar = backend.resolve_avatar(&case.patient_profile);
    let conversation = backend.open_conversation(&case);
    Ok(PreparedCase {
        case,
        avatar,
        conversation,
    })
}

pub struct ChatTurnJob {
    ticket: u64,
    message: String,
    voice: PresentationGender,
    conversation: Arc<dyn PatientConversation>,
    speech: Arc<dyn SpeechSynthesizer>,
}

pub struct ChatTurnOutcome {
    ticket: u64,
    result: SimResult<String>,
    audio: Option<AudioClip>,
}

impl ChatTurnJob {
    pub async fn run(self) -> ChatTurnOutcome {
        let result = self.conversation.send(&self.message).await;
        let audio = match &result {
            Ok(reply) => self.speech.synthesize(reply, self.voice).await,
            Err(_) => None,
        };
        ChatTurnOutcome {
            ticket: self.ticket,
            result,
            audio,
        }
    }
}

pub struct DebriefJob {
    ticket: u64,
    case: PharmacyCase,
    selected_problem: String,
    backend: Arc<dyn SimulationBackend>,
}

pub struct DebriefOutcome {
    ticket: u64,
    report: DebriefReport,
}

impl DebriefJob {
    /// Never fails: an upstream error becomes the degraded fallback report.
    pub async fn run(self) -> DebriefOutcome {
        let report = match self
            .backend
            .generate_debrief(&self.case, &self.selected_problem)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                warn!(case_title = %self.case.title, error = %e, "debrief failed, showing fallback");
                DebriefReport::degraded(e.user_message())
            }
        };
        DebriefOutcome {
            ticket: self.ticket,
            report,
        }
    }
}

// ── Simulator ────────────────────────────────────────────────────────────────

/// The explicit application-state object, injected with its collaborators.
pub struct Simulator {
    backend: Arc<dyn SimulationBackend>,
    speech: Arc<dyn SpeechSynthesizer>,
    clock: Arc<dyn Clock>,
    hints: HintLedger,
    transcripts: TranscriptLog,
    state: AppState,
    next_ticket: u64,
}

impl Simulator {
    /// A simulator with the system clock, no speech, and the default hint budget.
    pub fn new(backend: Arc<dyn SimulationBackend>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(backend, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        backend: Arc<dyn SimulationBackend>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            speech: Arc::new(SilentSpeech),
            hints: HintLedger::new(store.clone(), clock.clone(), DEFAULT_DAILY_HINTS),
            transcripts: TranscriptLog::new(store),
            clock,
            state: AppState::Idle { notice: None },
            next_ticket: 0,
        }
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = speech;
        self
    }

    pub fn with_daily_hint_budget(mut self, budget: u32) -> Self {
        self.hints = self.hints.with_daily_budget(budget);
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn active(&self) -> Option<&ActiveSimulation> {
        match &self.state {
            AppState::InSimulation(sim) => Some(&**sim),
            _ => None,
        }
    }

    pub fn debrief(&self) -> Option<&DebriefView> {
        match &self.state {
            AppState::Debriefing(view) => Some(&**view),
            _ => None,
        }
    }

    /// The message from the last failed generation, if the home screen shows one.
    pub fn notice(&self) -> Option<&str> {
        match &self.state {
            AppState::Idle { notice } => notice.as_deref(),
            _ => None,
        }
    }

    /// Hand the pending patient audio to the player.
    pub fn take_pending_audio(&mut self) -> Option<AudioClip> {
        match &mut self.state {
            AppState::InSimulation(sim) => sim.pending_audio.take(),
            _ => None,
        }
    }

    fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    // ── Generation ───────────────────────────────────────────────────────────

    /// Enter `Generating`. Any in-flight request is superseded.
    pub fn begin_generation(&mut self, filters: GenerationFilters) -> GenerationJob {
        let ticket = self.issue_ticket();
        info!(
            ticket,
            training_phase = %filters.training_phase,
            specialties = filters.specialties.len(),
            challenge_mode = filters.challenge_mode,
            "case generation requested"
        );
        self.state = AppState::Generating {
            ticket,
            filters: filters.clone(),
        };
        GenerationJob {
            ticket,
            filters,
            backend: self.backend.clone(),
        }
    }

    /// Request a replacement case with the current case's phase and specialty.
    pub fn regenerate(&mut self) -> SimResult<GenerationJob> {
        let sim = active_ref(&self.state)?;
        let filters = GenerationFilters::narrowed(sim.case.tags.training_phase, sim.case.tags.specialty);
        debug!(case_title = %sim.case.title, "regenerating with narrowed filters");
        Ok(self.begin_generation(filters))
    }

    /// Publish a finished generation.
    ///
    /// Returns `Ok(true)` when the case is now live and `Ok(false)` when the
    /// outcome was stale and dropped. A failed generation moves to `Idle`
    /// with a notice and returns the error.
    pub fn apply_generation(&mut self, outcome: GenerationOutcome) -> SimResult<bool> {
        let current = matches!(self.state, AppState::Generating { ticket, .. } if ticket == outcome.ticket);
        if !current {
            debug!(ticket = outcome.ticket, "stale generation result ignored");
            return Ok(false);
        }

        match outcome.result {
            Ok(prepared) => {
                self.enter_simulation(prepared);
                Ok(true)
            }
            Err(e) => {
                warn!(ticket = outcome.ticket, error = %e, "case generation failed");
                self.state = AppState::Idle {
                    notice: Some(e.user_message()),
                };
                Err(e)
            }
        }
    }

    /// Run a generation job to completion and publish it.
    pub async fn run_generation(&mut self, job: GenerationJob) -> SimResult<bool> {
        let outcome = job.run().await;
        self.apply_generation(outcome)
    }

    pub async fn start_generation(&mut self, filters: GenerationFilters) -> SimResult<bool> {
        let job = self.begin_generation(filters);
        self.run_generation(job).await
    }

    fn enter_simulation(&mut self, prepared: PreparedCase) {
        let title = prepared.case.title.clone();
        let transcript = self.transcripts.load(&title);
        let hints_remaining = self.hints.remaining();

        info!(
            case_title = %title,
            avatar = ?prepared.avatar.avatar_identifier,
            restored_messages = transcript.len(),
            hints_remaining,
            "case ready"
        );

        self.state = AppState::InSimulation(Box::new(ActiveSimulation {
            case: prepared.case,
            avatar: prepared.avatar,
            transcript,
            ordered_investigations: Vec::new(),
            started_at: self.clock.now(),
            hints_remaining,
            last_hint: None,
            patient_typing: false,
            pending_audio: None,
            conversation: prepared.conversation,
            turn_ticket: None,
        }));
    }

    // ── Chat ─────────────────────────────────────────────────────────────────

    /// Append the student's message and start the patient's turn.
    ///
    /// Fails if no case is live, the message is blank, or a reply is still
    /// outstanding. Any unplayed patient audio is dropped.
    pub fn begin_message(&mut self, text: &str) -> SimResult<ChatTurnJob> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SimError::StateMachine {
                reason: "Type a message before sending.".to_string(),
            });
        }
        if active_ref(&self.state)?.turn_ticket.is_some() {
            return Err(SimError::StateMachine {
                reason: "The patient is still replying.".to_string(),
            });
        }

        let ticket = self.issue_ticket();
        let sim = active_mut(&mut self.state)?;
        let timestamp = next_timestamp(self.clock.as_ref(), &sim.transcript);
        sim.transcript.push(ChatMessage::user(text, timestamp));
        sim.patient_typing = true;
        sim.pending_audio = None;
        sim.turn_ticket = Some(ticket);
        persist_transcript(&self.transcripts, sim);

        debug!(ticket, case_title = %sim.case.title, "chat turn started");
        Ok(ChatTurnJob {
            ticket,
            message: text.to_string(),
            voice: sim.avatar.gender,
            conversation: sim.conversation.clone(),
            speech: self.speech.clone(),
        })
    }

    /// Replace the typing indicator with the reply or an apology.
    ///
    /// Returns false when the turn belongs to a case that is no longer live.
    pub fn apply_message(&mut self, outcome: ChatTurnOutcome) -> bool {
        let AppState::InSimulation(sim) = &mut self.state else {
            debug!(ticket = outcome.ticket, "chat reply arrived after the case ended");
            return false;
        };
        if sim.turn_ticket != Some(outcome.ticket) {
            debug!(ticket = outcome.ticket, "stale chat reply ignored");
            return false;
        }

        sim.turn_ticket = None;
        sim.patient_typing = false;
        let timestamp = next_timestamp(self.clock.as_ref(), &sim.transcript);
        match outcome.result {
            Ok(reply) => {
                sim.transcript.push(ChatMessage::patient(reply, timestamp));
                sim.pending_audio = outcome.audio;
            }
            Err(e) => {
                warn!(case_title = %sim.case.title, error = %e, "chat turn failed");
                sim.transcript.push(ChatMessage::system(e.user_message(), timestamp));
            }
        }
        persist_transcript(&self.transcripts, sim);
        true
    }

    pub async fn send_message(&mut self, text: &str) -> SimResult<()> {
        let job = self.begin_message(text)?;
        let outcome = job.run().await;
        self.apply_message(outcome);
        Ok(())
    }

    // ── Hints and investigations ─────────────────────────────────────────────

    /// Ask for a hint.
    ///
    /// With no hints left this returns `Ok(None)` without calling the backend.
    /// The budget is only consumed when a hint is actually delivered.
    pub async fn request_hint(&mut self) -> SimResult<Option<String>> {
        let remaining = self.hints.remaining();
        let sim = active_mut(&mut self.state)?;
        sim.hints_remaining = remaining;
        if remaining == 0 {
            debug!(case_title = %sim.case.title, "hint requested with no budget left");
            return Ok(None);
        }
        let case = sim.case.clone();
        let transcript = sim.transcript.clone();

        let hint = self.backend.generate_hint(&case, &transcript).await?;

        let left = match self.hints.consume() {
            Ok(left) => left,
            Err(e) => {
                warn!(error = %e, "hint counter could not be saved");
                remaining - 1
            }
        };
        info!(case_title = %case.title, hints_remaining = left, "hint delivered");

        if let AppState::InSimulation(sim) = &mut self.state {
            if sim.case.title == case.title {
                sim.hints_remaining = left;
                sim.last_hint = Some(hint.clone());
            }
        }
        Ok(Some(hint))
    }

    /// Record an investigation order and return its catalog name.
    ///
    /// Ordering the same investigation twice is a no-op.
    pub fn order_investigation(&mut self, name: &str) -> SimResult<&'static str> {
        let wanted = name.trim();
        let canonical = INVESTIGATIONS
            .iter()
            .copied()
            .find(|i| i.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SimError::StateMachine {
                reason: format!("'{wanted}' is not an orderable investigation"),
            })?;

        let sim = active_mut(&mut self.state)?;
        if !sim.ordered_investigations.iter().any(|i| i == canonical) {
            sim.ordered_investigations.push(canonical.to_string());
            debug!(investigation = canonical, "investigation ordered");
        }
        Ok(canonical)
    }

    // ── Submission and debrief ───────────────────────────────────────────────

    /// Grade the selected problem and enter `Debriefing` with feedback loading.
    ///
    /// The persisted transcript for the case is cleared.
    pub fn submit_problem(&mut self, selected_problem: &str) -> SimResult<DebriefJob> {
        active_ref(&self.state)?;
        let ticket = self.issue_ticket();
        let AppState::InSimulation(sim) = std::mem::replace(&mut self.state, AppState::Idle { notice: None }) else {
            return Err(not_in_simulation());
        };

        let elapsed = (self.clock.now() - sim.started_at).num_seconds().max(0) as u64;
        let result = SimulationResult {
            problem_correct: sim.case.is_correct_selection(selected_problem),
            time_taken: elapsed,
            selected_problem: selected_problem.to_string(),
        };

        if let Err(e) = self.transcripts.clear(&sim.case.title) {
            warn!(case_title = %sim.case.title, error = %e, "could not clear saved transcript");
        }

        info!(
            ticket,
            case_title = %sim.case.title,
            problem_correct = result.problem_correct,
            time_taken = result.time_taken,
            "problem submitted"
        );

        let case = sim.case;
        self.state = AppState::Debriefing(Box::new(DebriefView {
            case: case.clone(),
            result,
            status: DebriefStatus::Loading,
            ticket,
        }));

        Ok(DebriefJob {
            ticket,
            case,
            selected_problem: selected_problem.to_string(),
            backend: self.backend.clone(),
        })
    }

    /// Fill in the loading debrief. Returns false if the student already left.
    pub fn apply_debrief(&mut self, outcome: DebriefOutcome) -> bool {
        match &mut self.state {
            AppState::Debriefing(view) if view.ticket == outcome.ticket => {
                debug!(degraded = outcome.report.is_degraded(), "debrief ready");
                view.status = DebriefStatus::Ready(outcome.report);
                true
            }
            _ => {
                debug!(ticket = outcome.ticket, "stale debrief ignored");
                false
            }
        }
    }

    pub async fn submit_and_debrief(&mut self, selected_problem: &str) -> SimResult<()> {
        let job = self.submit_problem(selected_problem)?;
        let outcome = job.run().await;
        self.apply_debrief(outcome);
        Ok(())
    }

    /// Back to the home screen, discarding case, result, and debrief.
    pub fn return_home(&mut self) {
        debug!(from = ?self.phase(), "returning home");
        self.state = AppState::Idle { notice: None };
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn not_in_simulation() -> SimError {
    SimError::StateMachine {
        reason: "No case is in progress.".to_string(),
    }
}

fn active_ref(state: &AppState) -> SimResult<&ActiveSimulation> {
    match state {
        AppState::InSimulation(sim) => Ok(&**sim),
        _ => Err(not_in_simulation()),
    }
}

fn active_mut(state: &mut AppState) -> SimResult<&mut ActiveSimulation> {
    match state {
        AppState::InSimulation(sim) => Ok(&mut **sim),
        _ => Err(not_in_simulation()),
    }
}

/// Now, or 1ms after the last message if the clock has not moved past it.
fn next_timestamp(clock: &dyn Clock, transcript: &[ChatMessage]) -> DateTime<Utc> {
    let now = clock.now();
    match transcript.last() {
        Some(last) if now <= last.timestamp => last.timestamp + Duration::milliseconds(1),
        _ => now,
    }
}

fn persist_transcript(transcripts: &TranscriptLog, sim: &ActiveSimulation) {
    if let Err(e) = transcripts.save(&sim.case.title, &sim.transcript) {
        warn!(case_title = %sim.case.title, error = %e, "could not save transcript");
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
