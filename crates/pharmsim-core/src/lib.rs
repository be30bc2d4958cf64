//! # pharmsim-core
//!
//! The session runtime for PharmSim.
//!
//! This crate provides:
//! - The collaborator traits (`SimulationBackend`, `GenerativeModel`,
//!   `Verifier`, `KeyValueStore`, ...) every outside service is reached through
//! - The `Simulator` state machine that drives a student from case generation
//!   to debrief
//! - Typed views over the local store (hint budget, transcripts, theme)
//! - A two-phase optimistic update helper
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pharmsim_core::{Simulator, traits::{SimulationBackend, KeyValueStore}};
//! ```

pub mod optimistic;
pub mod persist;
pub mod simulator;
pub mod traits;

pub use simulator::{AppState, Phase, Simulator};
