//! Case generation filters chosen on the home screen.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::labels::{Epa, PharmacyArea, TrainingPhase};

/// Everything the student selected before asking for a case.
///
/// Filters only shape the generation prompt; they are not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationFilters {
    pub training_phase: TrainingPhase,
    #[serde(default)]
    pub specialties: BTreeSet<PharmacyArea>,
    /// Free-text topic clusters, e.g. "Renal Dosing".
    #[serde(default)]
    pub sub_specialties: BTreeSet<String>,
    #[serde(default)]
    pub epas: BTreeSet<Epa>,
    #[serde(default)]
    pub challenge_mode: bool,
}

impl GenerationFilters {
    /// Filters with only a training phase set.
    pub fn new(training_phase: TrainingPhase) -> Self {
        Self {
            training_phase,
            specialties: BTreeSet::new(),
            sub_specialties: BTreeSet::new(),
            epas: BTreeSet::new(),
            challenge_mode: false,
        }
    }

    /// The filter set used when regenerating a case: phase and specialty only.
    pub fn narrowed(training_phase: TrainingPhase, specialty: PharmacyArea) -> Self {
        let mut filters = Self::new(training_phase);
        filters.specialties.insert(specialty);
        filters
    }

    pub fn with_specialty(mut self, area: PharmacyArea) -> Self {
        self.specialties.insert(area);
        self
    }

    pub fn with_sub_specialty(mut self, cluster: impl Into<String>) -> Self {
        let cluster = cluster.into();
        let trimmed = cluster.trim();
        if !trimmed.is_empty() {
            self.sub_specialties.insert(trimmed.to_string());
        }
        self
    }

    pub fn with_epa(mut self, epa: Epa) -> Self {
        self.epas.insert(epa);
        self
    }

    pub fn with_challenge_mode(mut self, on: bool) -> Self {
        self.challenge_mode = on;
        self
    }
}
