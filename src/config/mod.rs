//! Configuration management.
//!
//! TOML configuration with `${VAR_NAME}` substitution, `OFFSTUDY_*`
//! environment overrides, defaults for every setting and validation on load.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use offstudy::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("offstudy.toml")?;
//! println!("Boundary: {:?}", config.eligibility.boundary);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [eligibility]
//! compare_as_datetime = false
//! boundary = "inclusive"
//! terminal_outcomes = ["lost", "death", "completed_protocol", "off_study"]
//! timezone_offset_minutes = 120
//!
//! [registration]
//! require_dob = true
//! study_open_datetime = "2023-06-01T00:00:00Z"
//!
//! [storage]
//! backend = "memory"
//! seed_path = "${OFFSTUDY_SEED}"
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, BoundaryPolicy, EligibilityConfig, LoggingConfig, OffstudyConfig,
    RegistrationConfig, StorageBackend, StorageConfig,
};
