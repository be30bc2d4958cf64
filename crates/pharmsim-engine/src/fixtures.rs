//! Fictional case data and a canned model for offline runs.
//!
//! Nothing here contacts an external service. The offline responder answers
//! each kind of engine request (specialty, case, chat, hint, debrief) with
//! fixed text built around the sample case.

use serde_json::{json, Value};

use pharmsim_contracts::case::PharmacyCase;
use pharmsim_contracts::error::{SimError, SimResult};
use pharmsim_contracts::model::GenerationRequest;
use pharmsim_llm::ScriptedModel;

use crate::prompts::{HINT_PREAMBLE, PATIENT_PREAMBLE, SPECIALTY_PREAMBLE};

/// Text of the sample case's correct drug-related problem.
pub const SAMPLE_CORRECT_PROBLEM: &str =
    "Drug interaction: OTC ibuprofen is increasing bleeding risk with warfarin";

// ── Sample case ──────────────────────────────────────────────────────────────

/// B.Pharm Year 2, Community Pharmacy, Patient Counseling.
pub fn sample_case_json() -> Value {
    json!({
        "title": "Bruising After Starting a Painkiller",
        "patientProfile": {
            "name": "Margaret Thompson",
            "age": 68,
            "gender": "Female",
            "ethnicity": "White"
        },
        "tags": {
            "trainingPhase": "B.Pharm Year 2",
            "specialty": "Community Pharmacy",
            "cognitiveSkill": "Application",
            "epas": ["Patient Counseling"],
            "curriculum": {
                "framework": "Pharmacy Practice Competency Framework",
                "competency": "Identifies and resolves drug interactions"
            }
        },
        "chiefComplaint": "I've been bruising easily and my gums bleed when I brush.",
        "historyOfPresentIllness": "Ten days ago she started ibuprofen 400 mg three times daily, bought over the counter, for knee pain. Over the last week she noticed bruises on both forearms and bleeding gums. No falls, no black stools.",
        "medicationHistory": "Warfarin 5 mg once daily (atrial fibrillation, 3 years); amlodipine 5 mg once daily; ibuprofen 400 mg three times daily (OTC, 10 days).",
        "physicalExam": "Vitals: BP 138/84, HR 82 irregular, Temp 36.8 C\nSkin: scattered ecchymoses on both forearms\nOral: mild gingival bleeding\nMusculoskeletal: right knee crepitus, no effusion",
        "labResults": "Complete Blood Count: Hb 12.1 g/dL, WBC 6.8, Platelets 231\nINR: 4.6\nRenal Function Tests: Creatinine 1.0 mg/dL, eGFR 62\nLiver Function Tests: within normal limits\nSerum Electrolytes: Na 139, K 4.2",
        "drugRelatedProblems": [
            { "problem": SAMPLE_CORRECT_PROBLEM, "isCorrect": true },
            { "problem": "Subtherapeutic warfarin dose for atrial fibrillation", "isCorrect": false },
            { "problem": "Amlodipine causing peripheral oedema", "isCorrect": false },
            { "problem": "Untreated hypertension", "isCorrect": false }
        ],
        "mcqs": [
            {
                "question": "Which analgesic is the most appropriate alternative for her knee pain?",
                "options": ["Naproxen", "Paracetamol", "Aspirin", "Diclofenac"],
                "correctAnswerIndex": 1,
                "explanation": "Paracetamol at usual doses does not add antiplatelet or gastric bleeding risk to warfarin."
            },
            {
                "question": "What is the most appropriate next step for the pharmacist?",
                "options": [
                    "Advise her to double her warfarin dose",
                    "Stop ibuprofen and refer her to her anticoagulation clinic for INR review",
                    "Recommend vitamin K tablets from the pharmacy",
                    "Reassure her that bruising is expected"
                ],
                "correctAnswerIndex": 1,
                "explanation": "An INR of 4.6 with bleeding signs needs prompt review by the prescriber."
            }
        ],
        "correctProblemExplanation": "NSAIDs inhibit platelet function and irritate the gastric mucosa, and can raise the INR. Combined with warfarin this markedly increases bleeding risk, shown here by bruising, gum bleeding, and an INR of 4.6."
    })
}

pub fn sample_case() -> SimResult<PharmacyCase> {
    serde_json::from_value(sample_case_json()).map_err(|e| SimError::Parse {
        reason: format!("sample case: {e}"),
    })
}

pub fn sample_debrief_json() -> Value {
    json!({
        "stepwiseReasoning": "1. She recently started an OTC NSAID while taking warfarin. 2. New bruising and gum bleeding point to excess anticoagulant effect. 3. The INR of 4.6 confirms it. 4. The NSAID is the new factor, so the interaction is the priority problem.",
        "learningPearls": [
            "Always ask about OTC and herbal products in patients on warfarin.",
            "Paracetamol is the preferred simple analgesic with warfarin.",
            "Bleeding signs with a raised INR need same-day referral."
        ],
        "citations": [
            "NICE CKS: Anticoagulation - oral",
            "BNF: Warfarin interactions"
        ]
    })
}

// ── Offline model ────────────────────────────────────────────────────────────

/// Which engine component sent a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Specialty,
    Case,
    Chat,
    Hint,
    Debrief,
}

/// Classify a request by the prompt or schema it carries.
pub fn classify(request: &GenerationRequest) -> RequestKind {
    if let Some(schema) = &request.response_schema {
        if schema.pointer("/properties/drugRelatedProblems").is_some() {
            return RequestKind::Case;
        }
        return RequestKind::Debrief;
    }
    let system = request.system_instruction.as_deref().unwrap_or_default();
    let prompt = request.last_user_text().unwrap_or_default();
    if system.starts_with(PATIENT_PREAMBLE) {
        RequestKind::Chat
    } else if prompt.starts_with(HINT_PREAMBLE) {
        RequestKind::Hint
    } else if prompt.starts_with(SPECIALTY_PREAMBLE) {
        RequestKind::Specialty
    } else {
        RequestKind::Debrief
    }
}

fn patient_reply(message: &str) -> &'static str {
    let m = message.to_lowercase();
    if m.contains("medic") || m.contains("tablet") || m.contains("take") {
        "I take warfarin for my heart rhythm and a blood pressure pill. Oh, and I started some ibuprofen from the chemist for my knee."
    } else if m.contains("when") || m.contains("how long") || m.contains("start") {
        "The bruises started about a week ago, a few days after I began the ibuprofen."
    } else if m.contains("pain") || m.contains("knee") {
        "My right knee has been aching, that's why I bought the painkillers."
    } else if m.contains("blood") || m.contains("stool") || m.contains("urine") {
        "No blood in my stools or water that I've noticed, just the gums."
    } else {
        "I'm not sure what you mean, dear. Could you ask me that another way?"
    }
}

/// Canned answer for one request.
pub fn offline_reply(request: &GenerationRequest) -> SimResult<String> {
    let reply = match classify(request) {
        RequestKind::Specialty => "Community Pharmacy".to_string(),
        RequestKind::Case => format!("```json\n{}\n```", sample_case_json()),
        RequestKind::Debrief => sample_debrief_json().to_string(),
        RequestKind::Hint => {
            "Have you asked whether she recently started anything new, including medicines bought without a prescription?"
                .to_string()
        }
        RequestKind::Chat => {
            let message = request.last_user_text().ok_or_else(|| SimError::Upstream {
                reason: "chat request without a user turn".to_string(),
            })?;
            patient_reply(message).to_string()
        }
    };
    Ok(reply)
}

/// A model that answers every engine request from the fixtures.
pub fn offline_model() -> ScriptedModel {
    ScriptedModel::with_responder(offline_reply)
}
