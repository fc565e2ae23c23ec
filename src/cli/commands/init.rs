//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "offstudy.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing off-study configuration");
        println!();

        // Check if file already exists
        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Point storage.seed_path at a JSON dataset (optional)");
                println!("  3. Validate configuration: offstudy validate-config");
                println!("  4. Replay a scenario: offstudy replay scenario.json");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Off-Study Engine Configuration File

[application]
log_level = "info"

[eligibility]
compare_as_datetime = false
boundary = "inclusive"
terminal_outcomes = ["lost", "death", "completed_protocol", "off_study"]
timezone_offset_minutes = 0

[registration]
require_dob = false
allow_future_datetime = false
other_reason = "other"

[storage]
backend = "memory"

[logging]
local_enabled = false
local_path = "./logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Off-Study Engine Configuration File
#
# This file contains all configuration options with examples and explanations.
# Values of the form ${VAR} are replaced from the environment, and every
# setting can be overridden with OFFSTUDY_<SECTION>_<KEY>.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# Eligibility Checks
# ============================================================================
[eligibility]
# Compare full timestamps instead of calendar dates
compare_as_datetime = false

# Boundary at the off-study point:
# - inclusive: a report on the off-study date (or instant) is rejected
# - exclusive: only reports strictly after it are rejected
boundary = "inclusive"

# Visit outcomes after which no later scheduled data is accepted
terminal_outcomes = ["lost", "death", "completed_protocol", "off_study"]

# Offset from UTC, in minutes, used for calendar dates and messages
timezone_offset_minutes = 0

# ============================================================================
# Registration
# ============================================================================
[registration]
# Reject subjects without a recorded date of birth
require_dob = false

# Accept off-study datetimes in the future
allow_future_datetime = false

# Earliest acceptable off-study datetime (RFC 3339)
# study_open_datetime = "2023-06-01T00:00:00Z"

# Reason value that requires reason_other
other_reason = "other"

# ============================================================================
# Storage
# ============================================================================
[storage]
# Storage backend (memory)
backend = "memory"

# JSON dataset loaded at startup
# seed_path = "${OFFSTUDY_SEED_PATH}"

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Enable local JSON file logging
local_enabled = false

# Local log directory
local_path = "./logs"

# Log rotation (daily or hourly)
local_rotation = "daily"
"#
        .to_string()
    }
}
