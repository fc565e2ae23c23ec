//! Engine facade
//!
//! Wires the eligibility checker and the registrar to one set of stores
//! and one calendar.

use crate::adapters::storage::traits::Stores;
use crate::config::schema::OffstudyConfig;
use crate::core::calendar::LocalCalendar;
use crate::core::eligibility::EligibilityChecker;
use crate::core::registration::{OffstudyRegistrar, OffstudyRequest};
use crate::domain::guard::HasOffstudyGuard;
use crate::domain::ids::SubjectIdentifier;
use crate::domain::records::OffstudyRecord;
use crate::domain::Result;
use chrono::{DateTime, Utc};

/// Off-study engine
pub struct OffstudyService {
    checker: EligibilityChecker,
    registrar: OffstudyRegistrar,
    stores: Stores,
}

impl OffstudyService {
    /// Create the engine from configuration and injected stores
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the eligibility timezone is invalid.
    pub fn new(config: &OffstudyConfig, stores: Stores) -> Result<Self> {
        let calendar = LocalCalendar::from_offset_minutes(config.eligibility.timezone_offset_minutes)?;
        let checker = EligibilityChecker::new(config.eligibility.clone(), stores.clone())?;
        let registrar = OffstudyRegistrar::new(config.registration.clone(), calendar, stores.clone());

        Ok(Self {
            checker,
            registrar,
            stores,
        })
    }

    /// See [`EligibilityChecker::check`]
    pub async fn check(
        &self,
        subject_identifier: &SubjectIdentifier,
        report_datetime: DateTime<Utc>,
        compare_as_datetime: Option<bool>,
    ) -> Result<()> {
        self.checker
            .check(subject_identifier, report_datetime, compare_as_datetime)
            .await
    }

    /// See [`EligibilityChecker::check_record`]
    pub async fn check_record<R>(&self, record: &R) -> Result<()>
    where
        R: HasOffstudyGuard + Sync + ?Sized,
    {
        self.checker.check_record(record).await
    }

    /// See [`OffstudyRegistrar::register`]
    pub async fn register(&self, request: OffstudyRequest) -> Result<OffstudyRecord> {
        self.registrar.register(request).await
    }

    pub fn calendar(&self) -> &LocalCalendar {
        self.checker.calendar()
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }
}
