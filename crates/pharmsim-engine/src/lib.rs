//! # pharmsim-engine
//!
//! The simulation components behind `pharmsim_core::traits::SimulationBackend`.
//!
//! Each component makes one kind of model call and owns its failure policy:
//!
//! 1. **Case generator**: structured output checked by the JSON Schema and
//!    semantic rules in [`schema`]; any defect is a `Generation` error.
//! 2. **Specialty picker**: one label or the Community Pharmacy fallback.
//! 3. **Avatar picker**: pure demographics mapping, no model call.
//! 4. **Chat session**: persona-seeded history, one turn at a time, rolled
//!    back on failure.
//! 5. **Hint generator**: one Socratic hint that must not quote the answer.
//! 6. **Debrief generator**: structured feedback, degrading to a fallback
//!    when the output is unusable.
//!
//! [`backend::AiBackend`] wires them together. [`accounts`] adds the session
//! and notification services, and [`fixtures`] holds fictional data plus an
//! offline model that needs no network.

pub mod accounts;
pub mod avatar;
pub mod backend;
pub mod case_generator;
pub mod chat;
pub mod debrief;
pub mod fixtures;
pub mod hint;
pub mod prompts;
pub mod schema;
pub mod specialty;

pub use backend::{AiBackend, BackendSettings};
