//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{BoundaryPolicy, OffstudyConfig};
use crate::domain::errors::OffstudyError;
use crate::domain::result::Result;
use crate::domain::records::VisitOutcome;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into OffstudyConfig
/// 4. Applies environment variable overrides (OFFSTUDY_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use offstudy::config::loader::load_config;
///
/// let config = load_config("offstudy.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<OffstudyConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(OffstudyError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        OffstudyError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: OffstudyConfig = toml::from_str(&contents)
        .map_err(|e| OffstudyError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        OffstudyError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied through untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| OffstudyError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(OffstudyError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the OFFSTUDY_* prefix
///
/// Variables follow the pattern OFFSTUDY_<SECTION>_<KEY>, for example
/// OFFSTUDY_ELIGIBILITY_BOUNDARY. Unparseable numeric or boolean values
/// are reported rather than ignored.
fn apply_env_overrides(config: &mut OffstudyConfig) -> Result<()> {
    if let Ok(val) = std::env::var("OFFSTUDY_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Eligibility overrides
    if let Ok(val) = std::env::var("OFFSTUDY_ELIGIBILITY_COMPARE_AS_DATETIME") {
        config.eligibility.compare_as_datetime =
            parse_env("OFFSTUDY_ELIGIBILITY_COMPARE_AS_DATETIME", &val)?;
    }
    if let Ok(val) = std::env::var("OFFSTUDY_ELIGIBILITY_BOUNDARY") {
        config.eligibility.boundary = match val.to_lowercase().as_str() {
            "inclusive" => BoundaryPolicy::Inclusive,
            "exclusive" => BoundaryPolicy::Exclusive,
            other => {
                return Err(OffstudyError::Configuration(format!(
                    "OFFSTUDY_ELIGIBILITY_BOUNDARY must be 'inclusive' or 'exclusive', got '{other}'"
                )))
            }
        };
    }
    if let Ok(val) = std::env::var("OFFSTUDY_ELIGIBILITY_TERMINAL_OUTCOMES") {
        config.eligibility.terminal_outcomes = val
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<VisitOutcome>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                OffstudyError::Configuration(format!("OFFSTUDY_ELIGIBILITY_TERMINAL_OUTCOMES: {e}"))
            })?;
    }
    if let Ok(val) = std::env::var("OFFSTUDY_ELIGIBILITY_TIMEZONE_OFFSET_MINUTES") {
        config.eligibility.timezone_offset_minutes =
            parse_env("OFFSTUDY_ELIGIBILITY_TIMEZONE_OFFSET_MINUTES", &val)?;
    }

    // Registration overrides
    if let Ok(val) = std::env::var("OFFSTUDY_REGISTRATION_REQUIRE_DOB") {
        config.registration.require_dob = parse_env("OFFSTUDY_REGISTRATION_REQUIRE_DOB", &val)?;
    }
    if let Ok(val) = std::env::var("OFFSTUDY_REGISTRATION_ALLOW_FUTURE_DATETIME") {
        config.registration.allow_future_datetime =
            parse_env("OFFSTUDY_REGISTRATION_ALLOW_FUTURE_DATETIME", &val)?;
    }
    if let Ok(val) = std::env::var("OFFSTUDY_REGISTRATION_STUDY_OPEN_DATETIME") {
        config.registration.study_open_datetime =
            Some(parse_env("OFFSTUDY_REGISTRATION_STUDY_OPEN_DATETIME", &val)?);
    }

    // Storage overrides
    if let Ok(val) = std::env::var("OFFSTUDY_STORAGE_SEED_PATH") {
        config.storage.seed_path = Some(val);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("OFFSTUDY_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_env("OFFSTUDY_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("OFFSTUDY_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

fn parse_env<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        OffstudyError::Configuration(format!("Invalid value '{value}' for {name}: {e}"))
    })
}
