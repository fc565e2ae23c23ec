// Offstudy - Off-study eligibility and appointment retraction engine
// Copyright (c) 2025 Offstudy Contributors
// Licensed under the MIT License

//! # Offstudy - Off-Study Eligibility and Appointment Retraction
//!
//! Enforces the rule that once a clinical trial subject is taken off study, no
//! scheduled data dated after that point may be captured, and removes the
//! subject's future appointments when the off-study record is committed.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Checking** whether scheduled data for a subject may be captured
//! - **Registering** a subject off study after validating consent, date of
//!   birth, visit history and field rules
//! - **Retracting** appointments scheduled after the off-study datetime, in the
//!   same transaction as the registration
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (eligibility, registration, retraction)
//! - [`adapters`] - Storage traits and the in-memory backend
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::{DateTime, Utc};
//! use offstudy::adapters::storage::create_stores;
//! use offstudy::config::load_config;
//! use offstudy::core::{OffstudyRequest, OffstudyService};
//! use offstudy::domain::SubjectIdentifier;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("offstudy.toml")?;
//!     let stores = create_stores(&config).await?;
//!     let service = OffstudyService::new(&config, stores)?;
//!
//!     let subject = SubjectIdentifier::new("S-001")?;
//!     let offstudy_datetime: DateTime<Utc> = "2024-03-05T14:30:00Z".parse()?;
//!     service
//!         .register(OffstudyRequest::new(subject.clone(), offstudy_datetime, "death"))
//!         .await?;
//!
//!     // Later reports are rejected
//!     let report_datetime: DateTime<Utc> = "2024-03-06T09:00:00Z".parse()?;
//!     assert!(service.check(&subject, report_datetime, None).await.is_err());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`domain::Result`]. Rejections carry a stable code:
//!
//! ```rust
//! use offstudy::domain::{OffstudyError, RetractionError};
//!
//! let err: OffstudyError = RetractionError::Protected {
//!     appointment_id: "A-1".to_string(),
//!     scheduled_datetime: "2024-03-20 09:00".to_string(),
//!     references: "lab requisition".to_string(),
//! }
//! .into();
//! assert_eq!(err.code(), Some("protected"));
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
