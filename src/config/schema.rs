//! Configuration schema types
//!
//! This module defines the configuration structure that maps to `offstudy.toml`.
//! Every section has defaults, so an empty file is a valid configuration.

use crate::domain::records::VisitOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Boundary policy for the off-study comparison
///
/// Decides whether a report falling exactly on the off-study point is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Reject reports on or after the off-study point
    #[default]
    Inclusive,
    /// Reject reports strictly after the off-study point
    Exclusive,
}

/// Storage backend selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process store, optionally seeded from a JSON dataset
    #[default]
    Memory,
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OffstudyConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Eligibility checker settings
    #[serde(default)]
    pub eligibility: EligibilityConfig,

    /// Registrar settings
    #[serde(default)]
    pub registration: RegistrationConfig,

    /// Storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl OffstudyConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.eligibility.validate()?;
        self.registration.validate()?;
        self.storage.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Eligibility checker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityConfig {
    /// Compare full timestamps instead of calendar dates
    #[serde(default)]
    pub compare_as_datetime: bool,

    /// Whether the off-study point itself is rejected
    #[serde(default)]
    pub boundary: BoundaryPolicy,

    /// Visit outcomes after which no later scheduled data is accepted
    #[serde(default = "default_terminal_outcomes")]
    pub terminal_outcomes: Vec<VisitOutcome>,

    /// Offset from UTC used for calendar dates and message formatting
    #[serde(default)]
    pub timezone_offset_minutes: i32,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            compare_as_datetime: false,
            boundary: BoundaryPolicy::default(),
            terminal_outcomes: default_terminal_outcomes(),
            timezone_offset_minutes: 0,
        }
    }
}

impl EligibilityConfig {
    fn validate(&self) -> Result<(), String> {
        if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&self.timezone_offset_minutes) {
            return Err(format!(
                "eligibility.timezone_offset_minutes must be within +/-{MAX_OFFSET_MINUTES}, got {}",
                self.timezone_offset_minutes
            ));
        }

        if self
            .terminal_outcomes
            .iter()
            .any(|outcome| *outcome == VisitOutcome::Scheduled)
        {
            return Err("eligibility.terminal_outcomes may not include 'scheduled'".to_string());
        }

        Ok(())
    }
}

/// Registrar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Reject subjects whose date of birth is not recorded
    #[serde(default)]
    pub require_dob: bool,

    /// Accept off-study datetimes in the future
    #[serde(default)]
    pub allow_future_datetime: bool,

    /// Earliest acceptable off-study datetime
    #[serde(default)]
    pub study_open_datetime: Option<DateTime<Utc>>,

    /// Reason value that requires `reason_other`
    #[serde(default = "default_other_reason")]
    pub other_reason: String,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            require_dob: false,
            allow_future_datetime: false,
            study_open_datetime: None,
            other_reason: default_other_reason(),
        }
    }
}

impl RegistrationConfig {
    fn validate(&self) -> Result<(), String> {
        if self.other_reason.trim().is_empty() {
            return Err("registration.other_reason cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Storage backend
    #[serde(default)]
    pub backend: StorageBackend,

    /// JSON dataset loaded into the store at startup
    #[serde(default)]
    pub seed_path: Option<String>,
}

impl StorageConfig {
    fn validate(&self) -> Result<(), String> {
        if let Some(path) = &self.seed_path {
            if path.trim().is_empty() {
                return Err("storage.seed_path cannot be empty when set".to_string());
            }
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }

        Ok(())
    }
}

const MAX_OFFSET_MINUTES: i32 = 14 * 60;

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_terminal_outcomes() -> Vec<VisitOutcome> {
    vec![
        VisitOutcome::Lost,
        VisitOutcome::Death,
        VisitOutcome::CompletedProtocol,
        VisitOutcome::OffStudy,
    ]
}

fn default_other_reason() -> String {
    "other".to_string()
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = OffstudyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.eligibility.boundary, BoundaryPolicy::Inclusive);
        assert!(!config.eligibility.compare_as_datetime);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: OffstudyConfig = toml::from_str("").unwrap();
        assert_eq!(config.application.log_level, "info");
        assert_eq!(config.eligibility.terminal_outcomes.len(), 4);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = OffstudyConfig::default();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timezone_offset_out_of_range() {
        let mut config = OffstudyConfig::default();
        config.eligibility.timezone_offset_minutes = 15 * 60;
        assert!(config.validate().is_err());

        config.eligibility.timezone_offset_minutes = -14 * 60;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_extreme_timezone_offsets() {
        let mut config = OffstudyConfig::default();
        for minutes in [i32::MIN, i32::MAX] {
            config.eligibility.timezone_offset_minutes = minutes;
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_scheduled_cannot_be_terminal() {
        let mut config = OffstudyConfig::default();
        config.eligibility.terminal_outcomes = vec![VisitOutcome::Scheduled];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_boundary_and_outcomes() {
        let config: OffstudyConfig = toml::from_str(
            r#"
[eligibility]
boundary = "exclusive"
compare_as_datetime = true
terminal_outcomes = ["death", "lost"]
timezone_offset_minutes = 120
"#,
        )
        .unwrap();
        assert_eq!(config.eligibility.boundary, BoundaryPolicy::Exclusive);
        assert!(config.eligibility.compare_as_datetime);
        assert_eq!(
            config.eligibility.terminal_outcomes,
            vec![VisitOutcome::Death, VisitOutcome::Lost]
        );
    }

    #[test]
    fn test_invalid_rotation() {
        let mut config = OffstudyConfig::default();
        config.logging.local_rotation = "weekly".to_string();
        assert!(config.validate().is_err());
    }
}
