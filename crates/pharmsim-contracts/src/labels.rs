//! Closed enumerations shared by prompts, schemas, and the wire format.
//!
//! Every value serializes as its human-readable label (e.g. `"B.Pharm Year 2"`),
//! which is also the exact string the model must emit.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The wire label for this variant.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Exact, case-sensitive label lookup.
            pub fn from_label(label: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.as_str() == label)
            }

            /// All wire labels, in declaration order.
            pub fn labels() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

labelled_enum! {
    /// The student's year in the B.Pharm curriculum.
    pub enum TrainingPhase {
        Year1 => "B.Pharm Year 1",
        Year2 => "B.Pharm Year 2",
        Year3 => "B.Pharm Year 3",
        Year4 => "B.Pharm Year 4",
    }
}

labelled_enum! {
    /// Practice area a case is set in.
    pub enum PharmacyArea {
        Community => "Community Pharmacy",
        Hospital => "Hospital Pharmacy",
        Clinical => "Clinical Pharmacy",
        AmbulatoryCare => "Ambulatory Care Pharmacy",
    }
}

labelled_enum! {
    /// Entrustable Professional Activity the case focuses on.
    pub enum Epa {
        HistoryTaking => "History Taking",
        PatientCounseling => "Patient Counseling",
        TherapeuticIntervention => "Therapeutic Intervention",
        Documentation => "Documentation",
    }
}

labelled_enum! {
    pub enum CognitiveSkill {
        Recall => "Recall",
        Application => "Application",
        Analysis => "Analysis",
    }
}

labelled_enum! {
    pub enum Gender {
        Male => "Male",
        Female => "Female",
        Other => "Other",
    }
}

labelled_enum! {
    pub enum Ethnicity {
        SouthAsian => "South Asian",
        EastAsian => "East Asian",
        Black => "Black",
        White => "White",
        Hispanic => "Hispanic",
        MiddleEastern => "Middle Eastern",
        Other => "Other",
    }
}

impl Default for PharmacyArea {
    /// The documented fallback when a practice area cannot be chosen.
    fn default() -> Self {
        PharmacyArea::Community
    }
}
