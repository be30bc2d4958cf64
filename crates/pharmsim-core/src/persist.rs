//! Typed views over the local key/value store.
//!
//! Stored values may be absent, from another day, or corrupt. Reads never
//! fail: they log and fall back to defaults. Writes are last-write-wins.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use pharmsim_contracts::{
    account::ThemePreference,
    chat::ChatMessage,
    error::{SimError, SimResult},
};

use crate::traits::{Clock, KeyValueStore};

pub const THEME_KEY: &str = "pharmsim.theme";
pub const HINTS_KEY: &str = "pharmsim.hints";
const TRANSCRIPT_PREFIX: &str = "pharmsim.transcript.";

/// Hints a student may use per calendar day unless configured otherwise.
pub const DEFAULT_DAILY_HINTS: u32 = 10;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The stored form of the daily hint counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct HintRecord {
    /// Hints remaining for `date`.
    count: u32,
    /// "YYYY-MM-DD".
    date: String,
}

/// Read a key, treating store failures as "absent".
fn read_lenient(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!(key = %key, error = %e, "store read failed, using default");
            None
        }
    }
}

// ── Hint budget ──────────────────────────────────────────────────────────────

/// The daily hint counter.
///
/// The counter resets to the daily budget whenever the stored date differs
/// from today. It never goes below zero.
#[derive(Clone)]
pub struct HintLedger {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    daily_budget: u32,
}

impl HintLedger {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, daily_budget: u32) -> Self {
        Self {
            store,
            clock,
            daily_budget,
        }
    }

    pub fn with_daily_budget(mut self, daily_budget: u32) -> Self {
        self.daily_budget = daily_budget;
        self
    }

    pub fn daily_budget(&self) -> u32 {
        self.daily_budget
    }

    /// Hints left today.
    pub fn remaining(&self) -> u32 {
        let today = self.clock.today();
        let Some(raw) = read_lenient(self.store.as_ref(), HINTS_KEY) else {
            return self.daily_budget;
        };

        let record: HintRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "corrupt hint counter, resetting to daily budget");
                return self.daily_budget;
            }
        };

        match NaiveDate::parse_from_str(&record.date, DATE_FORMAT) {
            Ok(date) if date == today => record.count.min(self.daily_budget),
            Ok(_) => {
                debug!(stored_date = %record.date, "hint counter is from another day, resetting");
                self.daily_budget
            }
            Err(e) => {
                warn!(stored_date = %record.date, error = %e, "unreadable hint counter date");
                self.daily_budget
            }
        }
    }

    /// Use one hint. Returns the count left afterwards.
    ///
    /// At zero this is a no-op that returns 0.
    pub fn consume(&self) -> SimResult<u32> {
        let remaining = self.remaining();
        if remaining == 0 {
            return Ok(0);
        }
        let left = remaining - 1;
        self.write(left)?;
        Ok(left)
    }

    fn write(&self, count: u32) -> SimResult<()> {
        let record = HintRecord {
            count,
            date: self.clock.today().format(DATE_FORMAT).to_string(),
        };
        let raw = serde_json::to_string(&record).map_err(|e| SimError::Storage { reason: e.to_string() })?;
        self.store.set(HINTS_KEY, &raw)
    }
}

// ── Transcripts ──────────────────────────────────────────────────────────────

/// Per-case chat transcripts, keyed by case title.
#[derive(Clone)]
pub struct TranscriptLog {
    store: Arc<dyn KeyValueStore>,
}

impl TranscriptLog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn key_for(case_title: &str) -> String {
        format!("{TRANSCRIPT_PREFIX}{case_title}")
    }

    /// The saved transcript, or empty if absent or corrupt.
    pub fn load(&self, case_title: &str) -> Vec<ChatMessage> {
        let key = Self::key_for(case_title);
        let Some(raw) = read_lenient(self.store.as_ref(), &key) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(case_title = %case_title, error = %e, "corrupt transcript discarded");
                Vec::new()
            }
        }
    }

    pub fn save(&self, case_title: &str, messages: &[ChatMessage]) -> SimResult<()> {
        let raw = serde_json::to_string(messages).map_err(|e| SimError::Storage { reason: e.to_string() })?;
        self.store.set(&Self::key_for(case_title), &raw)
    }

    pub fn clear(&self, case_title: &str) -> SimResult<()> {
        self.store.remove(&Self::key_for(case_title))
    }
}

// ── Theme ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ThemeStore {
    store: Arc<dyn KeyValueStore>,
}

impl ThemeStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The saved theme; `Light` when absent or unreadable.
    pub fn load(&self) -> ThemePreference {
        match read_lenient(self.store.as_ref(), THEME_KEY).as_deref() {
            Some("dark") => ThemePreference::Dark,
            Some("light") | None => ThemePreference::Light,
            Some(other) => {
                warn!(value = %other, "unknown theme preference");
                ThemePreference::Light
            }
        }
    }

    pub fn save(&self, theme: ThemePreference) -> SimResult<()> {
        let value = match theme {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
        };
        self.store.set(THEME_KEY, value)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{DateTime, TimeZone, Utc};

    use super::*;

    #[derive(Default)]
    struct MapStore {
        values: Mutex<HashMap<String, String>>,
    }

    impl KeyValueStore for MapStore {
        fn get(&self, key: &str) -> SimResult<Option<String>> {
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> SimResult<()> {
            self.values.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) -> SimResult<()> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }

    /// A store whose every read fails.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> SimResult<Option<String>> {
            Err(SimError::Storage { reason: "disk gone".to_string() })
        }

        fn set(&self, _key: &str, _value: &str) -> SimResult<()> {
            Err(SimError::Storage { reason: "disk gone".to_string() })
        }

        fn remove(&self, _key: &str) -> SimResult<()> {
            Ok(())
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }

        // Pinned so the tests do not depend on the host time zone.
        fn today(&self) -> NaiveDate {
            self.0.date_naive()
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()))
    }

    #[test]
    fn fresh_ledger_starts_at_daily_budget() {
        let ledger = HintLedger::new(Arc::new(MapStore::default()), clock(), DEFAULT_DAILY_HINTS);
        assert_eq!(ledger.remaining(), 10);
    }

    #[test]
    fn consume_decrements_and_persists_today() {
        let store = Arc::new(MapStore::default());
        let ledger = HintLedger::new(store.clone(), clock(), 3);

        assert_eq!(ledger.consume().unwrap(), 2);
        assert_eq!(ledger.remaining(), 2);

        let raw = store.get(HINTS_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["count"], 2);
        assert_eq!(value["date"], "2026-03-14");
    }

    #[test]
    fn budget_never_goes_negative() {
        let ledger = HintLedger::new(Arc::new(MapStore::default()), clock(), 1);
        assert_eq!(ledger.consume().unwrap(), 0);
        assert_eq!(ledger.consume().unwrap(), 0);
        assert_eq!(ledger.remaining(), 0);
    }

    #[test]
    fn stale_date_resets_the_counter() {
        let store = Arc::new(MapStore::default());
        store.set(HINTS_KEY, r#"{"count":0,"date":"2026-03-13"}"#).unwrap();
        let ledger = HintLedger::new(store, clock(), 10);
        assert_eq!(ledger.remaining(), 10);
    }

    #[test]
    fn corrupt_counter_falls_back_to_default() {
        let store = Arc::new(MapStore::default());
        store.set(HINTS_KEY, "{not json").unwrap();
        let ledger = HintLedger::new(store.clone(), clock(), 10);
        assert_eq!(ledger.remaining(), 10);

        store.set(HINTS_KEY, r#"{"count":-4,"date":"2026-03-14"}"#).unwrap();
        assert_eq!(ledger.remaining(), 10, "negative counts do not deserialize");

        store.set(HINTS_KEY, r#"{"count":4,"date":"yesterday"}"#).unwrap();
        assert_eq!(ledger.remaining(), 10);
    }

    #[test]
    fn failing_store_reads_as_defaults() {
        let store: Arc<dyn KeyValueStore> = Arc::new(BrokenStore);
        assert_eq!(HintLedger::new(store.clone(), clock(), 10).remaining(), 10);
        assert!(TranscriptLog::new(store.clone()).load("Any case").is_empty());
        assert_eq!(ThemeStore::new(store).load(), ThemePreference::Light);
    }

    #[test]
    fn transcript_round_trips_and_clears() {
        let store = Arc::new(MapStore::default());
        let log = TranscriptLog::new(store);
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        let messages = vec![
            ChatMessage::user("Do you take your tablets?", now),
            ChatMessage::patient("Most days.", now + chrono::Duration::seconds(2)),
        ];

        log.save("Case A", &messages).unwrap();
        assert_eq!(log.load("Case A"), messages);
        assert!(log.load("Case B").is_empty());

        log.clear("Case A").unwrap();
        assert!(log.load("Case A").is_empty());
    }

    #[test]
    fn corrupt_transcript_is_empty() {
        let store = Arc::new(MapStore::default());
        store.set(&TranscriptLog::key_for("Case A"), "[{\"sender\":\"ghost\"}]").unwrap();
        assert!(TranscriptLog::new(store).load("Case A").is_empty());
    }

    #[test]
    fn theme_defaults_to_light_and_persists() {
        let store = Arc::new(MapStore::default());
        let themes = ThemeStore::new(store.clone());
        assert_eq!(themes.load(), ThemePreference::Light);

        themes.save(ThemePreference::Dark).unwrap();
        assert_eq!(themes.load(), ThemePreference::Dark);

        store.set(THEME_KEY, "sepia").unwrap();
        assert_eq!(themes.load(), ThemePreference::Light);
    }
}
