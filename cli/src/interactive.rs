//! The interactive `simulate` loop.

use std::io::Write as _;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use pharmsim_contracts::catalog::INVESTIGATIONS;
use pharmsim_contracts::chat::{ChatMessage, Sender};
use pharmsim_contracts::filters::GenerationFilters;
use pharmsim_core::simulator::{DebriefStatus, GenerationJob};
use pharmsim_core::Simulator;
use pharmsim_verify::clinical_text::{parse_complex_lab_result, parse_exam_sections};

const HELP: &str = "\
Type a question to talk to the patient, or a command:
  /exam              physical examination
  /order <test>      order an investigation
  /labs              results of ordered investigations
  /problems          candidate drug-related problems
  /hint              ask the preceptor for a hint
  /submit <n|text>   submit a drug-related problem
  /regenerate        new case, same phase and practice area
                     (retries the last request when no case is open)
  /quit              leave without submitting";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Help,
    Exam,
    Order(String),
    Labs,
    Problems,
    Hint,
    Submit(String),
    Regenerate,
    Quit,
    Say(String),
    Unknown(String),
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Some(Input::Say(line.to_string()));
    };
    let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
    let rest = rest.trim().to_string();
    let input = match name.to_lowercase().as_str() {
        "help" | "?" => Input::Help,
        "exam" => Input::Exam,
        "order" if !rest.is_empty() => Input::Order(rest),
        "labs" => Input::Labs,
        "problems" => Input::Problems,
        "hint" => Input::Hint,
        "submit" if !rest.is_empty() => Input::Submit(rest),
        "regenerate" => Input::Regenerate,
        "quit" | "exit" => Input::Quit,
        _ => Input::Unknown(line.to_string()),
    };
    Some(input)
}

fn say(message: &ChatMessage) {
    let who = match message.sender {
        Sender::User => "You",
        Sender::Patient => "Patient",
        Sender::System => "System",
    };
    println!("{who}: {}", message.text);
}

fn show_case(sim: &Simulator) {
    let Some(active) = sim.active() else { return };
    let case = &active.case;
    let profile = &case.patient_profile;

    println!();
    println!("{}", case.title);
    println!("{}", "=".repeat(case.title.chars().count()));
    println!(
        "{} | {} | {} | {}",
        case.tags.training_phase, case.tags.specialty, case.tags.cognitive_skill, case.tags.curriculum.competency
    );
    println!(
        "Patient: {}, {} years, {}, {}  [avatar: {}]",
        profile.name,
        profile.age,
        profile.gender,
        profile.ethnicity,
        active
            .avatar
            .avatar_identifier
            .map(|id| id.as_str())
            .unwrap_or("generic")
    );
    println!("Chief complaint: {}", case.chief_complaint);
    println!("Hints left today: {}", active.hints_remaining);

    if !active.transcript.is_empty() {
        println!();
        println!("Restored conversation:");
        active.transcript.iter().for_each(say);
    }
    println!();
    println!("{HELP}");
}

fn show_problems(sim: &Simulator) {
    if let Some(active) = sim.active() {
        for (i, p) in active.case.drug_related_problems.iter().enumerate() {
            println!("  {}. {}", i + 1, p.problem);
        }
    }
}

fn show_debrief(sim: &Simulator) {
    let Some(view) = sim.debrief() else { return };
    let DebriefStatus::Ready(report) = &view.status else {
        println!("Feedback is still loading.");
        return;
    };

    println!();
    if let Some(notice) = &report.notice {
        println!("Note: {notice}");
    }
    println!("Reasoning:\n{}", report.data.stepwise_reasoning);
    if !report.data.learning_pearls.is_empty() {
        println!("\nLearning pearls:");
        report.data.learning_pearls.iter().for_each(|p| println!("  - {p}"));
    }
    if !report.data.citations.is_empty() {
        println!("\nReferences:");
        report.data.citations.iter().for_each(|c| println!("  - {c}"));
    }

    if !view.case.mcqs.is_empty() {
        println!("\nReview questions:");
        for (i, mcq) in view.case.mcqs.iter().enumerate() {
            println!("{}. {}", i + 1, mcq.question);
            for (j, option) in mcq.options.iter().enumerate() {
                let marker = if j == mcq.correct_answer_index { "*" } else { " " };
                println!("   {marker} {option}");
            }
            println!("   {}", mcq.explanation);
        }
    }
}

/// Resolve "2" to the second candidate problem; anything else is taken as typed.
fn selected_problem(sim: &Simulator, choice: &str) -> String {
    let problems = sim.active().map(|a| a.case.drug_related_problems.as_slice()).unwrap_or(&[]);
    choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| problems.get(i))
        .map(|p| p.problem.clone())
        .unwrap_or_else(|| choice.to_string())
}

/// The next case request: narrowed from the open case, or a retry of
/// `last` after a failed generation left no case open.
fn next_generation(sim: &mut Simulator, last: &GenerationFilters) -> GenerationJob {
    match sim.regenerate() {
        Ok(job) => job,
        Err(_) => sim.begin_generation(last.clone()),
    }
}

/// Run one generation and report it. Returns whether a case is open.
async fn generate(sim: &mut Simulator, job: GenerationJob) -> bool {
    println!("Generating a case for {}...", job.filters().training_phase);
    match sim.run_generation(job).await {
        Ok(_) => {
            show_case(sim);
            sim.active().is_some()
        }
        Err(e) => {
            println!("{}", e.user_message());
            println!("Type /regenerate to try again or /quit to leave.");
            false
        }
    }
}

pub async fn run_session(mut sim: Simulator, filters: GenerationFilters) {
    let mut last_filters = filters.clone();
    let job = sim.begin_generation(filters);
    generate(&mut sim, job).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        if let Err(e) = std::io::stdout().flush() {
            debug!(error = %e, "stdout flush failed");
        }

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            _ => break,
        };
        let Some(input) = parse_input(&line) else { continue };

        match input {
            Input::Help => println!("{HELP}"),
            Input::Unknown(text) => println!("Unknown command '{text}'. Type /help."),
            Input::Exam => {
                if let Some(active) = sim.active() {
                    for section in parse_exam_sections(&active.case.physical_exam) {
                        println!("  {}: {}", section.title, section.findings);
                    }
                }
            }
            Input::Problems => show_problems(&sim),
            Input::Order(name) => match sim.order_investigation(&name) {
                Ok(test) => {
                    if let Some(active) = sim.active() {
                        println!("  {test}: {}", parse_complex_lab_result(&active.case.lab_results, test));
                    }
                }
                Err(e) => {
                    println!("{}", e.user_message());
                    println!("Orderable: {}", INVESTIGATIONS.join(", "));
                }
            },
            Input::Labs => {
                if let Some(active) = sim.active() {
                    if active.ordered_investigations.is_empty() {
                        println!("  No investigations ordered yet.");
                    }
                    for test in &active.ordered_investigations {
                        println!("  {test}: {}", parse_complex_lab_result(&active.case.lab_results, test));
                    }
                }
            }
            Input::Hint => match sim.request_hint().await {
                Ok(Some(hint)) => {
                    let left = sim.active().map(|a| a.hints_remaining).unwrap_or(0);
                    println!("Hint: {hint} ({left} left today)");
                }
                Ok(None) => println!("No hints left today."),
                Err(e) => println!("{}", e.user_message()),
            },
            Input::Say(text) => match sim.send_message(&text).await {
                Ok(()) => {
                    if let Some(reply) = sim.active().and_then(|a| a.transcript.last()) {
                        say(reply);
                    }
                    if let Some(clip) = sim.take_pending_audio() {
                        println!("  [audio: {} bytes, {}]", clip.bytes.len(), clip.mime_type);
                    }
                }
                Err(e) => println!("{}", e.user_message()),
            },
            Input::Regenerate => {
                let job = next_generation(&mut sim, &last_filters);
                last_filters = job.filters().clone();
                generate(&mut sim, job).await;
            }
            Input::Submit(choice) => {
                let selected = selected_problem(&sim, &choice);
                let job = match sim.submit_problem(&selected) {
                    Ok(job) => job,
                    Err(e) => {
                        println!("{}", e.user_message());
                        continue;
                    }
                };
                if let Some(view) = sim.debrief() {
                    let verdict = if view.result.problem_correct { "Correct" } else { "Incorrect" };
                    println!("\n{verdict} ({}s). You selected: {}", view.result.time_taken, view.result.selected_problem);
                    if let Some(correct) = view.case.correct_problem() {
                        println!("Correct problem: {}", correct.problem);
                    }
                    println!("{}", view.case.correct_problem_explanation);
                    println!("\nPreparing feedback...");
                }
                let outcome = job.run().await;
                sim.apply_debrief(outcome);
                show_debrief(&sim);
                sim.return_home();
                break;
            }
            Input::Quit => {
                sim.return_home();
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pharmsim_contracts::error::SimError;
    use pharmsim_contracts::labels::{PharmacyArea, TrainingPhase};
    use pharmsim_core::Phase;
    use pharmsim_engine::fixtures::sample_case_json;
    use pharmsim_engine::{AiBackend, BackendSettings};
    use pharmsim_llm::ScriptedModel;
    use pharmsim_store::InMemoryStore;

    use super::*;

    fn simulator(replies: Vec<Result<String, SimError>>) -> Simulator {
        let model = Arc::new(ScriptedModel::with_queue(replies));
        let backend = Arc::new(AiBackend::new(model, BackendSettings::default()));
        Simulator::new(backend, Arc::new(InMemoryStore::new()))
    }

    fn upstream_down() -> Result<String, SimError> {
        Err(SimError::Upstream { reason: "HTTP 503".to_string() })
    }

    // ── Generation recovery ──────────────────────────────────────────────────

    #[tokio::test]
    async fn failed_first_case_can_be_retried() {
        let mut sim = simulator(vec![upstream_down(), Ok(sample_case_json().to_string())]);
        let filters = GenerationFilters::new(TrainingPhase::Year3).with_specialty(PharmacyArea::Clinical);

        let job = sim.begin_generation(filters.clone());
        assert!(!generate(&mut sim, job).await);
        assert_eq!(sim.phase(), Phase::Idle);
        assert!(sim.notice().is_some());

        let retry = next_generation(&mut sim, &filters);
        assert_eq!(retry.filters(), &filters);
        assert!(generate(&mut sim, retry).await);
        assert_eq!(sim.phase(), Phase::InSimulation);
        assert_eq!(sim.active().unwrap().case.tags.training_phase, TrainingPhase::Year3);
    }

    #[tokio::test]
    async fn open_case_regenerates_narrowed() {
        let mut sim = simulator(vec![Ok(sample_case_json().to_string())]);
        let filters = GenerationFilters::new(TrainingPhase::Year2)
            .with_specialty(PharmacyArea::Community)
            .with_challenge_mode(true);

        let job = sim.begin_generation(filters.clone());
        assert!(generate(&mut sim, job).await);

        let next = next_generation(&mut sim, &filters);
        assert_eq!(
            next.filters(),
            &GenerationFilters::narrowed(TrainingPhase::Year2, PharmacyArea::Community)
        );
    }

    // ── Input parsing ────────────────────────────────────────────────────────

    #[test]
    fn plain_text_is_speech() {
        assert_eq!(parse_input("  Hello there "), Some(Input::Say("Hello there".to_string())));
        assert_eq!(parse_input("   "), None);
    }

    #[test]
    fn commands_parse() {
        assert_eq!(parse_input("/order  INR"), Some(Input::Order("INR".to_string())));
        assert_eq!(parse_input("/SUBMIT 2"), Some(Input::Submit("2".to_string())));
        assert_eq!(parse_input("/hint"), Some(Input::Hint));
        assert_eq!(parse_input("/quit"), Some(Input::Quit));
    }

    #[test]
    fn commands_missing_arguments_are_unknown() {
        assert_eq!(parse_input("/order"), Some(Input::Unknown("/order".to_string())));
        assert_eq!(parse_input("/dance"), Some(Input::Unknown("/dance".to_string())));
    }
}
