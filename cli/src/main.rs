//! PharmSim: terminal front end.
//!
//! Drives the same `Simulator` state machine a graphical client would, with
//! the Gemini backend or, with `--offline`, a canned model and fictional case.
//!
//! Usage:
//!   pharmsim simulate --phase 2 --specialty community --epa patient
//!   pharmsim generate --phase 3 > case.json
//!   pharmsim --offline simulate
//!   pharmsim avatar --age 70 --gender male
//!   pharmsim specialty --phase 1
//!   pharmsim theme dark

mod args;
mod interactive;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pharmsim_config::SimConfig;
use pharmsim_contracts::account::ThemePreference;
use pharmsim_contracts::case::PatientProfile;
use pharmsim_contracts::error::{SimError, SimResult};
use pharmsim_contracts::filters::GenerationFilters;
use pharmsim_contracts::labels::{Epa, Ethnicity, Gender, PharmacyArea, TrainingPhase};
use pharmsim_core::persist::ThemeStore;
use pharmsim_core::traits::{GenerativeModel, KeyValueStore};
use pharmsim_core::Simulator;
use pharmsim_engine::avatar::AvatarPicker;
use pharmsim_engine::case_generator::CaseGenerator;
use pharmsim_engine::fixtures::offline_model;
use pharmsim_engine::specialty::SpecialtyPicker;
use pharmsim_engine::{AiBackend, BackendSettings};
use pharmsim_llm::{GeminiClient, GeminiConfig};
use pharmsim_store::FileStore;

use crate::args::{parse_area, parse_epa, parse_gender, parse_phase};

// ── CLI definition ────────────────────────────────────────────────────────────

/// PharmSim: AI patient cases for pharmacy students.
#[derive(Parser)]
#[command(
    name = "pharmsim",
    about = "Clinical simulation for pharmacy students",
    long_about = "Generates AI-authored patient cases, lets you interview the patient,\n\
                  order investigations, submit a drug-related problem, and read a debrief."
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the built-in offline model and sample case instead of Gemini.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct FilterArgs {
    /// Training phase: 1-4 or "B.Pharm Year N".
    #[arg(long, default_value = "1", value_parser = parse_phase)]
    phase: TrainingPhase,

    /// Practice area (repeatable). Omit to let the model choose.
    #[arg(long = "specialty", value_parser = parse_area)]
    specialties: Vec<PharmacyArea>,

    /// Free-text topic cluster (repeatable), e.g. "Renal Dosing".
    #[arg(long = "topic")]
    topics: Vec<String>,

    /// EPA focus (repeatable).
    #[arg(long = "epa", value_parser = parse_epa)]
    epas: Vec<Epa>,

    /// Harder cases with subtler presentations.
    #[arg(long)]
    challenge: bool,
}

impl FilterArgs {
    fn to_filters(&self) -> GenerationFilters {
        let mut filters = GenerationFilters::new(self.phase).with_challenge_mode(self.challenge);
        for area in &self.specialties {
            filters = filters.with_specialty(*area);
        }
        for topic in &self.topics {
            filters = filters.with_sub_specialty(topic.as_str());
        }
        for epa in &self.epas {
            filters = filters.with_epa(*epa);
        }
        filters
    }
}

#[derive(Subcommand)]
enum Command {
    /// Generate one case and print it as JSON.
    Generate(FilterArgs),
    /// Run an interactive simulation session.
    Simulate(FilterArgs),
    /// Show the avatar chosen for a patient's age and gender.
    Avatar {
        #[arg(long)]
        age: u32,
        #[arg(long, value_parser = parse_gender)]
        gender: Gender,
    },
    /// Ask the model to pick a practice area for a training phase.
    Specialty {
        #[arg(long, default_value = "1", value_parser = parse_phase)]
        phase: TrainingPhase,
    },
    /// Show or set the saved theme preference.
    Theme {
        /// "light" or "dark". Omit to print the current value.
        value: Option<String>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pharmsim: {}", e.user_message());
            debug!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> SimResult<()> {
    let config = SimConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Generate(filters) => {
            let model = build_model(&config, cli.offline)?;
            let generator = CaseGenerator::new(model, config.model.case_model.clone());
            let case = generator.generate_case(&filters.to_filters()).await?;
            let json = serde_json::to_string_pretty(&case).map_err(|e| SimError::Parse {
                reason: e.to_string(),
            })?;
            println!("{json}");
        }
        Command::Simulate(filters) => {
            let model = build_model(&config, cli.offline)?;
            let backend = Arc::new(AiBackend::new(model, BackendSettings::from(&config)));
            let simulator = Simulator::new(backend, open_store(&config)?)
                .with_daily_hint_budget(config.hints.daily_budget);
            interactive::run_session(simulator, filters.to_filters()).await;
        }
        Command::Avatar { age, gender } => {
            let picker = AvatarPicker::new(config.avatar.other_gender_presentation);
            let avatar = picker.pick_avatar(&PatientProfile {
                name: String::new(),
                age,
                gender,
                ethnicity: Ethnicity::Other,
            });
            match avatar.avatar_identifier {
                Some(id) => println!("{id} (voice: {})", avatar.gender.as_str()),
                None => println!("generic (voice: {})", avatar.gender.as_str()),
            }
        }
        Command::Specialty { phase } => {
            let model = build_model(&config, cli.offline)?;
            let picker = SpecialtyPicker::new(model, config.model.case_model.clone());
            println!("{}", picker.pick_specialty(phase).await);
        }
        Command::Theme { value } => {
            let themes = ThemeStore::new(open_store(&config)?);
            match value.as_deref().map(str::trim) {
                None => println!("{}", theme_name(themes.load())),
                Some(v) if v.eq_ignore_ascii_case("dark") => themes.save(ThemePreference::Dark)?,
                Some(v) if v.eq_ignore_ascii_case("light") => themes.save(ThemePreference::Light)?,
                Some(v) => {
                    return Err(SimError::Config {
                        reason: format!("unknown theme '{v}', expected light or dark"),
                    })
                }
            }
        }
    }
    Ok(())
}

// ── Wiring ────────────────────────────────────────────────────────────────────

fn build_model(config: &SimConfig, offline: bool) -> SimResult<Arc<dyn GenerativeModel>> {
    if offline {
        debug!("using offline model");
        return Ok(Arc::new(offline_model()));
    }
    let client = GeminiClient::new(GeminiConfig {
        base_url: config.model.base_url.clone(),
        api_key: Some(config.api_key()?),
        timeout: Duration::from_secs(config.model.timeout_secs),
        default_temperature: Some(config.model.temperature),
    })?;
    Ok(Arc::new(client))
}

fn open_store(config: &SimConfig) -> SimResult<Arc<dyn KeyValueStore>> {
    let dir = match &config.store.dir {
        Some(dir) => dir.clone(),
        None => dirs::data_dir()
            .map(|d| d.join("pharmsim"))
            .unwrap_or_else(|| PathBuf::from(".pharmsim")),
    };
    debug!(dir = %dir.display(), "opening store");
    Ok(Arc::new(FileStore::open(dir)?))
}

fn theme_name(theme: ThemePreference) -> &'static str {
    match theme {
        ThemePreference::Light => "light",
        ThemePreference::Dark => "dark",
    }
}
