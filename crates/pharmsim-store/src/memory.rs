//! In-memory implementation of `KeyValueStore`.
//!
//! `InMemoryStore` keeps every value in a `HashMap` behind `Arc<Mutex<_>>`.
//! Clones share the same map, so a test can hand one clone to the simulator
//! and inspect the other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pharmsim_contracts::error::{SimError, SimResult};
use pharmsim_core::traits::KeyValueStore;

#[derive(Clone, Default)]
pub struct InMemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.values.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> SimResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values.lock().map_err(|e| SimError::Storage {
            reason: format!("store lock poisoned: {e}"),
        })
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> SimResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SimResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> SimResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
