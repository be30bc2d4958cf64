//! # pharmsim-contracts
//!
//! Shared types, schemas, and error contracts for PharmSim.
//!
//! All crates in the workspace import from here. No orchestration lives in
//! this crate, only data definitions, closed catalogs, and error types.

pub mod account;
pub mod avatar;
pub mod case;
pub mod catalog;
pub mod chat;
pub mod debrief;
pub mod error;
pub mod filters;
pub mod labels;
pub mod model;
pub mod verify;
