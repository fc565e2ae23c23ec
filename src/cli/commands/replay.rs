//! Replay command implementation
//!
//! This module implements the `replay` command, which loads a JSON scenario
//! (a dataset plus a list of actions) into the in-memory store and runs every
//! action through the engine.

use crate::adapters::memory::{Dataset, InMemoryStore};
use crate::adapters::storage::factory::open_memory_store;
use crate::adapters::storage::traits::Stores;
use crate::config::load_config;
use crate::config::schema::OffstudyConfig;
use crate::core::{OffstudyRequest, OffstudyService};
use crate::domain::{OffstudyError, SubjectIdentifier};
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Arguments for the replay command
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Path to the scenario JSON file
    pub scenario: String,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the final dataset to this path
    #[arg(long, value_name = "PATH")]
    pub output_dataset: Option<String>,
}

/// Dataset and actions to replay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    /// Initial store contents; falls back to `storage.seed_path` when absent
    #[serde(default)]
    pub dataset: Option<Dataset>,

    #[serde(default)]
    pub actions: Vec<ScenarioAction>,
}

impl Scenario {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid scenario {}", path.display()))
    }
}

/// One step of a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioAction {
    /// Ask whether a report may be captured
    Check {
        subject_identifier: SubjectIdentifier,
        report_datetime: DateTime<Utc>,
        #[serde(default)]
        compare_as_datetime: Option<bool>,
    },

    /// Register a subject off study
    Register(OffstudyRequest),
}

impl ScenarioAction {
    fn name(&self) -> &'static str {
        match self {
            ScenarioAction::Check { .. } => "check",
            ScenarioAction::Register(_) => "register",
        }
    }

    fn subject_identifier(&self) -> &SubjectIdentifier {
        match self {
            ScenarioAction::Check {
                subject_identifier, ..
            } => subject_identifier,
            ScenarioAction::Register(request) => &request.subject_identifier,
        }
    }
}

/// Result of one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub index: usize,
    pub action: String,
    pub subject_identifier: String,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

/// Result of a whole replay
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub outcomes: Vec<ActionOutcome>,
    pub accepted: usize,
    pub rejected: usize,
    pub appointments_remaining: usize,
    #[serde(skip)]
    pub dataset: Dataset,
}

impl ReplayReport {
    pub fn all_accepted(&self) -> bool {
        self.rejected == 0
    }
}

/// Run every action of a scenario in order
///
/// Rejections are recorded in the report; the replay continues with the
/// next action.
///
/// # Errors
///
/// Returns an error if the dataset is inconsistent or the engine cannot be built.
pub async fn run_scenario(
    config: &OffstudyConfig,
    scenario: Scenario,
) -> anyhow::Result<ReplayReport> {
    let store = match scenario.dataset {
        Some(dataset) => InMemoryStore::from_dataset(dataset)?,
        None => open_memory_store(config.storage.seed_path.as_deref())?,
    };
    let service = OffstudyService::new(config, Stores::from_backend(Arc::new(store.clone())))?;

    let mut outcomes = Vec::with_capacity(scenario.actions.len());
    for (index, action) in scenario.actions.into_iter().enumerate() {
        let name = action.name().to_string();
        let subject_identifier = action.subject_identifier().to_string();

        let result: Result<String, OffstudyError> = match action {
            ScenarioAction::Check {
                subject_identifier,
                report_datetime,
                compare_as_datetime,
            } => service
                .check(&subject_identifier, report_datetime, compare_as_datetime)
                .await
                .map(|_| "Report may be captured".to_string()),
            ScenarioAction::Register(request) => service
                .register(request)
                .await
                .map(|record| {
                    format!(
                        "Off study as of {}",
                        service.calendar().format_datetime(record.offstudy_datetime)
                    )
                }),
        };

        outcomes.push(match result {
            Ok(message) => ActionOutcome {
                index,
                action: name,
                subject_identifier,
                accepted: true,
                code: None,
                message,
            },
            Err(e) => ActionOutcome {
                index,
                action: name,
                subject_identifier,
                accepted: false,
                code: Some(e.code().unwrap_or("error").to_string()),
                message: e.to_string(),
            },
        });
    }

    let accepted = outcomes.iter().filter(|o| o.accepted).count();
    let rejected = outcomes.len() - accepted;

    Ok(ReplayReport {
        outcomes,
        accepted,
        rejected,
        appointments_remaining: store.appointment_count().await,
        dataset: store.snapshot().await,
    })
}

impl ReplayArgs {
    /// Execute the replay command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(scenario = %self.scenario, "Starting replay command");

        let config = if Path::new(config_path).exists() {
            match load_config(config_path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(error = %e, "Configuration validation failed");
                    eprintln!("Configuration validation failed: {e}");
                    return Ok(2); // Configuration error exit code
                }
            }
        } else {
            tracing::info!(config_path = %config_path, "No configuration file, using defaults");
            OffstudyConfig::default()
        };

        let scenario = Scenario::from_file(&self.scenario)?;
        let report = run_scenario(&config, scenario).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            Self::print_report(&report);
        }

        if let Some(ref path) = self.output_dataset {
            let contents = serde_json::to_string_pretty(&report.dataset)?;
            fs::write(path, contents)
                .with_context(|| format!("Failed to write dataset {path}"))?;
            tracing::info!(path = %path, "Final dataset written");
        }

        Ok(if report.all_accepted() { 0 } else { 1 })
    }

    fn print_report(report: &ReplayReport) {
        println!("🔁 Replaying {} action(s)", report.outcomes.len());
        println!();

        for outcome in &report.outcomes {
            let marker = if outcome.accepted { "✅" } else { "❌" };
            println!(
                "{marker} #{} {} {}",
                outcome.index + 1,
                outcome.action,
                outcome.subject_identifier
            );
            match &outcome.code {
                Some(code) => println!("   [{code}] {}", outcome.message),
                None => println!("   {}", outcome.message),
            }
        }

        println!();
        println!("📊 Summary:");
        println!("  Accepted: {}", report.accepted);
        println!("  Rejected: {}", report.rejected);
        println!("  Appointments remaining: {}", report.appointments_remaining);
    }
}
