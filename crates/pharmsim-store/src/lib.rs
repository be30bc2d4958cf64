//! # pharmsim-store
//!
//! `KeyValueStore` backends for the PharmSim local store: theme preference,
//! the daily hint counter, and per-case transcripts.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pharmsim_store::{FileStore, InMemoryStore};
//! use pharmsim_core::traits::KeyValueStore;
//!
//! let store = FileStore::open(data_dir.join("store"))?;
//! store.set("pharmsim.theme", "dark")?;
//! ```

pub mod file;
pub mod memory;

pub use file::{key_file_name, FileStore};
pub use memory::InMemoryStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
