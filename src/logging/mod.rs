//! Logging and observability
//!
//! Structured logging built on `tracing`:
//! - Configurable log levels (overridable with `RUST_LOG`)
//! - Console output on stderr
//! - Optional JSON file logging with rotation
//!
//! # Example
//!
//! ```no_run
//! use offstudy::logging::init_logging;
//! use offstudy::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(subject_identifier = "S-001", "Off-study registered");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a rejected domain operation with its stable code
///
/// # Example
///
/// ```no_run
/// use offstudy::log_rejection;
/// use offstudy::domain::{OffstudyError, RegistrationError};
///
/// let error: OffstudyError = RegistrationError::MissingReason.into();
/// log_rejection!("S-001", &error, "register");
/// ```
#[macro_export]
macro_rules! log_rejection {
    ($subject:expr, $error:expr, $operation:expr) => {
        tracing::warn!(
            subject_identifier = %$subject,
            operation = $operation,
            code = $error.code().unwrap_or("error"),
            error = %$error,
            "Rejected"
        );
    };
}
