//! Prompt text for every model call.
//!
//! Prompts embed enum values by their wire labels so the model answers in the
//! exact vocabulary the schemas accept.

use pharmsim_contracts::case::PharmacyCase;
use pharmsim_contracts::catalog::INVESTIGATIONS;
use pharmsim_contracts::chat::{ChatMessage, Sender};
use pharmsim_contracts::filters::GenerationFilters;
use pharmsim_contracts::labels::{CognitiveSkill, Epa, Ethnicity, Gender, PharmacyArea, TrainingPhase};

/// First line of the patient persona.
pub const PATIENT_PREAMBLE: &str = "You are role-playing a patient speaking with a pharmacy student.";

/// First line of the hint prompt.
pub const HINT_PREAMBLE: &str = "You are a clinical pharmacy preceptor guiding a student through a case.";

/// First line of the specialty prompt.
pub const SPECIALTY_PREAMBLE: &str = "Choose the practice area for a pharmacy training case.";

pub const CASE_SYSTEM_INSTRUCTION: &str = "You write realistic, clinically accurate patient cases for pharmacy education. \
Output a single JSON object that conforms to the provided schema. Use only the allowed values for enumerated fields.";

pub const DEBRIEF_SYSTEM_INSTRUCTION: &str = "You are a clinical pharmacy educator writing concise, evidence-based feedback. \
Output a single JSON object that conforms to the provided schema.";

fn join_labels<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The case request. `specialty` has already been resolved when the student
/// picked none.
pub fn case_prompt(filters: &GenerationFilters, specialty: PharmacyArea) -> String {
    let mut areas: Vec<PharmacyArea> = filters.specialties.iter().copied().collect();
    if areas.is_empty() {
        areas.push(specialty);
    }

    let mut lines = vec![
        "Create one patient case for a pharmacy student.".to_string(),
        format!("Training phase: {}.", filters.training_phase),
        format!("Practice area (use one of these for tags.specialty): {}.", join_labels(&areas)),
    ];

    lines.push(if filters.sub_specialties.is_empty() {
        "Topic focus: any topic suitable for the practice area.".to_string()
    } else {
        format!("Topic focus: {}.", join_labels(&filters.sub_specialties))
    });

    lines.push(if filters.epas.is_empty() {
        format!("EPA focus: choose the most relevant EPAs from: {}.", Epa::labels().join(", "))
    } else {
        format!("EPA focus (tags.epas must include these): {}.", join_labels(&filters.epas))
    });

    lines.push(if filters.challenge_mode {
        "Challenge mode: make the case harder. Use subtle presentations, plausible distractors, \
         and require analysis rather than recall."
            .to_string()
    } else {
        "Difficulty: appropriate for the training phase.".to_string()
    });

    lines.extend([
        String::new(),
        "Requirements:".to_string(),
        format!(
            "- patientProfile.gender is one of: {}; patientProfile.ethnicity is one of: {}.",
            Gender::labels().join(", "),
            Ethnicity::labels().join(", ")
        ),
        format!("- tags.cognitiveSkill is one of: {}.", CognitiveSkill::labels().join(", ")),
        format!("- tags.trainingPhase is one of: {}.", TrainingPhase::labels().join(", ")),
        "- physicalExam is \"Section: findings\" text, one section per line (for example \"Vitals: BP 130/85, HR 78\").".to_string(),
        format!(
            "- labResults has one line per test in the form \"<test name>: <value>\". Include every one of: {}. \
             Write \"Not available\" for tests that were not performed.",
            INVESTIGATIONS.join(", ")
        ),
        "- drugRelatedProblems has exactly 4 entries; exactly one has isCorrect set to true.".to_string(),
        "- mcqs has 2 to 5 questions, each with exactly 4 options and a correctAnswerIndex from 0 to 3.".to_string(),
        "- correctProblemExplanation explains why the correct drug-related problem is the priority.".to_string(),
    ]);
    lines.join("\n")
}

pub fn specialty_prompt(phase: TrainingPhase) -> String {
    format!(
        "{SPECIALTY_PREAMBLE}\nThe student is in {phase}.\n\
         Answer with exactly one of the following names and nothing else:\n{}",
        PharmacyArea::labels().join("\n")
    )
}

/// System instruction that seeds the simulated patient.
pub fn patient_persona(case: &PharmacyCase) -> String {
    let profile = &case.patient_profile;
    format!(
        "{PATIENT_PREAMBLE}\n\
         Your name is {name}. You are {age} years old ({gender}).\n\
         Why you came in: {complaint}\n\n\
         Your story (history of present illness): {hpi}\n\n\
         Your medicines: {meds}\n\n\
         Examination findings (you know these only as a patient would): {exam}\n\n\
         Test results you may have been told about: {labs}\n\n\
         Rules:\n\
         - Reveal information only when the student asks about it.\n\
         - Stay in character as the patient at all times. Never mention that you are an AI or that this is a simulation.\n\
         - Use everyday language, not medical jargon.\n\
         - Keep answers short: one to three sentences.",
        name = profile.name,
        age = profile.age,
        gender = profile.gender,
        complaint = case.chief_complaint,
        hpi = case.history_of_present_illness,
        meds = case.medication_history,
        exam = case.physical_exam,
        labs = case.lab_results,
    )
}

fn transcript_text(transcript: &[ChatMessage]) -> String {
    if transcript.is_empty() {
        return "(The student has not spoken to the patient yet.)".to_string();
    }
    transcript
        .iter()
        .map(|m| {
            let who = match m.sender {
                Sender::User => "Student",
                Sender::Patient => "Patient",
                Sender::System => "System",
            };
            format!("{who}: {}", m.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn hint_prompt(case: &PharmacyCase, transcript: &[ChatMessage]) -> String {
    let problems = case
        .drug_related_problems
        .iter()
        .map(|p| format!("- {}", p.problem))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{HINT_PREAMBLE}\n\
         Case: {title}\nChief complaint: {complaint}\nMedications: {meds}\n\n\
         Candidate drug-related problems:\n{problems}\n\n\
         Conversation so far:\n{conversation}\n\n\
         Give one Socratic hint of one or two sentences that points the student toward the next useful question \
         or investigation. Do not name or quote the correct drug-related problem and do not reveal the answer.",
        title = case.title,
        complaint = case.chief_complaint,
        meds = case.medication_history,
        conversation = transcript_text(transcript),
    )
}

pub fn debrief_prompt(case: &PharmacyCase, selected_problem: &str) -> String {
    let correct = case
        .correct_problem()
        .map(|p| p.problem.as_str())
        .unwrap_or("(not recorded)");
    let verdict = if case.is_correct_selection(selected_problem) {
        "correct"
    } else {
        "incorrect"
    };
    format!(
        "Write a debrief for a pharmacy student who just finished this case.\n\
         Case: {title}\nChief complaint: {complaint}\nHistory: {hpi}\nMedications: {meds}\nLabs:\n{labs}\n\n\
         Correct drug-related problem: {correct}\n\
         Case explanation: {explanation}\n\
         The student selected: {selected} ({verdict}).\n\n\
         In stepwiseReasoning, explain step by step why the correct drug-related problem is correct and why the \
         student's selection was right or wrong. Give 3 to 5 learningPearls and list citations to guidelines or \
         references that support the reasoning.",
        title = case.title,
        complaint = case.chief_complaint,
        hpi = case.history_of_present_illness,
        meds = case.medication_history,
        labs = case.lab_results,
        explanation = case.correct_problem_explanation,
        selected = selected_problem,
    )
}

#[cfg(test)]
mod tests {
    use pharmsim_contracts::labels::{Epa, PharmacyArea, TrainingPhase};

    use super::*;
    use crate::fixtures::sample_case;

    #[test]
    fn case_prompt_embeds_every_filter_dimension() {
        let filters = GenerationFilters::new(TrainingPhase::Year2)
            .with_specialty(PharmacyArea::Community)
            .with_sub_specialty("OTC Counseling")
            .with_epa(Epa::PatientCounseling)
            .with_challenge_mode(true);
        let prompt = case_prompt(&filters, PharmacyArea::Community);

        assert!(prompt.contains("B.Pharm Year 2"));
        assert!(prompt.contains("Community Pharmacy"));
        assert!(prompt.contains("OTC Counseling"));
        assert!(prompt.contains("Patient Counseling"));
        assert!(prompt.contains("Challenge mode"));
        assert!(prompt.contains("Serum Electrolytes"));
    }

    #[test]
    fn case_prompt_uses_picked_specialty_when_none_selected() {
        let filters = GenerationFilters::new(TrainingPhase::Year4);
        let prompt = case_prompt(&filters, PharmacyArea::Hospital);
        assert!(prompt.contains("Hospital Pharmacy"));
        assert!(!prompt.contains("Challenge mode"));
    }

    #[test]
    fn case_prompt_is_one_instruction_per_line() {
        let prompt = case_prompt(&GenerationFilters::new(TrainingPhase::Year1), PharmacyArea::Clinical);
        let lines: Vec<&str> = prompt.lines().collect();

        assert_eq!(lines[0], "Create one patient case for a pharmacy student.");
        assert_eq!(lines[1], "Training phase: B.Pharm Year 1.");
        let requirements = lines.iter().position(|l| *l == "Requirements:").unwrap();
        assert_eq!(lines[requirements - 1], "");
        assert!(lines[requirements + 1..].iter().all(|l| l.starts_with("- ")));
        assert!(!prompt.ends_with('\n'));
    }

    #[test]
    fn persona_carries_case_details_and_rules() {
        let case = sample_case().unwrap();
        let persona = patient_persona(&case);
        assert!(persona.starts_with(PATIENT_PREAMBLE));
        assert!(persona.contains(&case.patient_profile.name));
        assert!(persona.contains(&case.medication_history));
        assert!(persona.contains("Stay in character"));
    }

    #[test]
    fn debrief_prompt_states_verdict() {
        let case = sample_case().unwrap();
        let correct = case.correct_problem().unwrap().problem.clone();
        assert!(debrief_prompt(&case, &correct).contains("(correct)"));
        assert!(debrief_prompt(&case, "Something else").contains("(incorrect)"));
    }

    #[test]
    fn hint_prompt_includes_transcript() {
        let case = sample_case().unwrap();
        let now = chrono::Utc::now();
        let transcript = vec![ChatMessage::user("Do you take any painkillers?", now)];
        let prompt = hint_prompt(&case, &transcript);
        assert!(prompt.starts_with(HINT_PREAMBLE));
        assert!(prompt.contains("Student: Do you take any painkillers?"));
        assert!(hint_prompt(&case, &[]).contains("has not spoken"));
    }
}
