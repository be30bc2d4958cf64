//! The pharmacy case: the central artifact of one simulation session.
//!
//! A case is created once by the case generator, published to the session
//! state machine, and never mutated afterwards. Field names serialize in
//! camelCase because the same shape is the model's output contract.

use serde::{Deserialize, Serialize};

use crate::labels::{CognitiveSkill, Epa, Ethnicity, Gender, PharmacyArea, TrainingPhase};

/// A fully generated, verified patient case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyCase {
    pub title: String,
    pub patient_profile: PatientProfile,
    pub tags: CaseTags,
    pub chief_complaint: String,
    pub history_of_present_illness: String,
    pub medication_history: String,
    /// Semi-structured "Section: findings" text.
    pub physical_exam: String,
    /// One investigation per line, "<name>: <value>".
    pub lab_results: String,
    /// Exactly four candidates, exactly one flagged correct.
    pub drug_related_problems: Vec<DrugRelatedProblem>,
    pub mcqs: Vec<Mcq>,
    pub correct_problem_explanation: String,
}

impl PharmacyCase {
    /// The single drug-related problem flagged as correct.
    ///
    /// Returns `None` when the invariant is broken (zero or several flagged),
    /// so callers can never grade against an ambiguous answer key.
    pub fn correct_problem(&self) -> Option<&DrugRelatedProblem> {
        let mut flagged = self.drug_related_problems.iter().filter(|p| p.is_correct);
        match (flagged.next(), flagged.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    /// True when `selected` is exactly the text of the correct problem.
    pub fn is_correct_selection(&self, selected: &str) -> bool {
        self.correct_problem()
            .map(|p| p.problem == selected)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub ethnicity: Ethnicity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseTags {
    pub training_phase: TrainingPhase,
    pub specialty: PharmacyArea,
    pub cognitive_skill: CognitiveSkill,
    pub epas: Vec<Epa>,
    pub curriculum: Curriculum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    pub framework: String,
    pub competency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugRelatedProblem {
    pub problem: String,
    pub is_correct: bool,
}

/// A multiple-choice question attached to a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mcq {
    pub question: String,
    /// Always four options.
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer_index: usize,
    pub explanation: String,
}

impl Mcq {
    /// The option text `correct_answer_index` points at, if in range.
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_answer_index).map(String::as_str)
    }
}
