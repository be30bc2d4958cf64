//! Value parsers for filter flags.
//!
//! Each accepts the full wire label in any case, or a short key: `1`–`4` for
//! training phases and the first word of the label for everything else.

use pharmsim_contracts::labels::{Epa, Gender, PharmacyArea, TrainingPhase};

fn parse_label<T: Copy>(all: &[T], label: fn(T) -> &'static str, input: &str) -> Result<T, String> {
    let wanted = input.trim().to_lowercase();
    all.iter()
        .copied()
        .find(|v| {
            let full = label(*v).to_lowercase();
            full == wanted || full.split_whitespace().next() == Some(wanted.as_str())
        })
        .ok_or_else(|| {
            let names: Vec<&str> = all.iter().map(|v| label(*v)).collect();
            format!("expected one of: {}", names.join(", "))
        })
}

pub fn parse_phase(input: &str) -> Result<TrainingPhase, String> {
    match input.trim() {
        "1" => Ok(TrainingPhase::Year1),
        "2" => Ok(TrainingPhase::Year2),
        "3" => Ok(TrainingPhase::Year3),
        "4" => Ok(TrainingPhase::Year4),
        other => parse_label(TrainingPhase::ALL, TrainingPhase::as_str, other),
    }
}

pub fn parse_area(input: &str) -> Result<PharmacyArea, String> {
    parse_label(PharmacyArea::ALL, PharmacyArea::as_str, input)
}

pub fn parse_epa(input: &str) -> Result<Epa, String> {
    parse_label(Epa::ALL, Epa::as_str, input)
}

pub fn parse_gender(input: &str) -> Result<Gender, String> {
    parse_label(Gender::ALL, Gender::as_str, input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_by_number_and_label() {
        assert_eq!(parse_phase("2"), Ok(TrainingPhase::Year2));
        assert_eq!(parse_phase("b.pharm year 4"), Ok(TrainingPhase::Year4));
        assert!(parse_phase("5").is_err());
    }

    #[test]
    fn areas_and_epas_by_first_word() {
        assert_eq!(parse_area("community"), Ok(PharmacyArea::Community));
        assert_eq!(parse_area("Ambulatory"), Ok(PharmacyArea::AmbulatoryCare));
        assert_eq!(parse_epa("patient"), Ok(Epa::PatientCounseling));
        assert_eq!(parse_epa("therapeutic intervention"), Ok(Epa::TherapeuticIntervention));
        assert!(parse_area("retail").unwrap_err().contains("Community Pharmacy"));
    }

    #[test]
    fn genders() {
        assert_eq!(parse_gender("other"), Ok(Gender::Other));
        assert!(parse_gender("x").is_err());
    }
}
