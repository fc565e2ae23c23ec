//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates after parsing and applying overrides
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!(
            "  Comparison: {}",
            if config.eligibility.compare_as_datetime {
                "datetime"
            } else {
                "date"
            }
        );
        println!("  Boundary: {:?}", config.eligibility.boundary);
        println!(
            "  Terminal Outcomes: {}",
            config
                .eligibility
                .terminal_outcomes
                .iter()
                .map(|o| o.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!(
            "  Timezone Offset: {} minutes",
            config.eligibility.timezone_offset_minutes
        );
        println!("  Require DOB: {}", config.registration.require_dob);
        println!(
            "  Allow Future Datetime: {}",
            config.registration.allow_future_datetime
        );
        if let Some(open) = config.registration.study_open_datetime {
            println!("  Study Open: {}", open.to_rfc3339());
        }
        println!("  Storage Backend: {:?}", config.storage.backend);
        if let Some(ref seed) = config.storage.seed_path {
            println!("  Seed Dataset: {seed}");
        }
        println!();
        Ok(0)
    }
}
