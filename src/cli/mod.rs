//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for the off-study engine using clap.

pub mod commands;

use crate::config::{load_config, LoggingConfig};
use clap::{Parser, Subcommand};
use std::path::Path;

/// Off-study eligibility and appointment retraction engine
#[derive(Parser, Debug)]
#[command(name = "offstudy")]
#[command(version, about, long_about = None)]
#[command(author = "Offstudy Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "offstudy.toml", env = "OFFSTUDY_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "OFFSTUDY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level and logging sections for the process
    ///
    /// Taken from the configuration file when it exists and loads; otherwise
    /// console-only logging. `--log-level` overrides `[application].log_level`.
    pub fn logging_settings(&self) -> (String, LoggingConfig) {
        let loaded = if Path::new(&self.config).exists() {
            load_config(&self.config).ok()
        } else {
            None
        };

        let (config_level, logging) = match loaded {
            Some(config) => (Some(config.application.log_level), config.logging),
            None => (None, LoggingConfig::default()),
        };

        let level = self
            .log_level
            .clone()
            .or(config_level)
            .unwrap_or_else(|| "info".to_string());
        (level, logging)
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),

    /// Replay a scenario of checks and registrations against an in-memory store
    Replay(commands::replay::ReplayArgs),
}
