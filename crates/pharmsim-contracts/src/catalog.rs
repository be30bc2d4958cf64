//! Fixed catalogs the UI offers and the case generator must honour.

use crate::labels::PharmacyArea;

/// Investigations the student can order during a simulation.
///
/// Every generated case carries a `labResults` line for each of these.
pub const INVESTIGATIONS: &[&str] = &[
    "Complete Blood Count",
    "Basic Metabolic Panel",
    "Liver Function Tests",
    "Renal Function Tests",
    "Lipid Profile",
    "HbA1c",
    "Fasting Blood Glucose",
    "Thyroid Function Tests",
    "Urinalysis",
    "INR",
    "Serum Electrolytes",
    "ECG",
];

/// Shown for any investigation the case text does not mention.
pub const RESULT_NOT_AVAILABLE: &str = "Result not available in this case.";

/// Value written into `labResults` for investigations the model left out.
pub const NOT_PERFORMED: &str = "Not available";

/// Suggested topic clusters per practice area.
pub fn topic_clusters(area: PharmacyArea) -> &'static [&'static str] {
    match area {
        PharmacyArea::Community => &[
            "Minor Ailments",
            "OTC Counseling",
            "Chronic Disease Follow-up",
        ],
        PharmacyArea::Hospital => &[
            "Antimicrobial Stewardship",
            "Parenteral Therapy",
            "Renal Dosing",
        ],
        PharmacyArea::Clinical => &["Cardiology", "Endocrinology", "Infectious Disease"],
        PharmacyArea::AmbulatoryCare => &[
            "Anticoagulation Clinic",
            "Asthma/COPD",
            "Hypertension Clinic",
        ],
    }
}

/// True if `name` is a catalog investigation (case-insensitive).
pub fn is_investigation(name: &str) -> bool {
    let wanted = name.trim();
    INVESTIGATIONS.iter().any(|i| i.eq_ignore_ascii_case(wanted))
}
