//! Off-study registration
//!
//! Validates a request, then inserts the off-study record and retracts
//! future appointments in one transaction.

use crate::adapters::storage::traits::{
    ConsentStore, OffstudyStore, ScheduleStore, ScheduleTransaction, Stores, SubjectRegistry,
    VisitStore,
};
use crate::config::schema::RegistrationConfig;
use crate::core::calendar::LocalCalendar;
use crate::core::retraction::AppointmentRetractor;
use crate::domain::ids::SubjectIdentifier;
use crate::domain::records::OffstudyRecord;
use crate::domain::{OffstudyError, RegistrationError, Result};
use crate::log_rejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to take a subject off study
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffstudyRequest {
    pub subject_identifier: SubjectIdentifier,
    pub offstudy_datetime: DateTime<Utc>,
    pub reason: String,
    #[serde(default)]
    pub reason_other: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl OffstudyRequest {
    pub fn new(
        subject_identifier: SubjectIdentifier,
        offstudy_datetime: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            subject_identifier,
            offstudy_datetime,
            reason: reason.into(),
            reason_other: None,
            comment: None,
        }
    }

    pub fn with_reason_other(mut self, reason_other: impl Into<String>) -> Self {
        self.reason_other = Some(reason_other.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    fn into_record(self) -> OffstudyRecord {
        OffstudyRecord {
            subject_identifier: self.subject_identifier,
            offstudy_datetime: self.offstudy_datetime,
            reason: self.reason.trim().to_string(),
            reason_other: self.reason_other,
            comment: self.comment,
            created_at: Utc::now(),
        }
    }
}

/// Registers subjects off study
pub struct OffstudyRegistrar {
    config: RegistrationConfig,
    calendar: LocalCalendar,
    stores: Stores,
    retractor: AppointmentRetractor,
}

impl OffstudyRegistrar {
    pub fn new(config: RegistrationConfig, calendar: LocalCalendar, stores: Stores) -> Self {
        Self {
            config,
            calendar,
            stores,
            retractor: AppointmentRetractor::new(calendar),
        }
    }

    /// Register a subject off study
    ///
    /// Validation stops at the first failing rule and mutates nothing. Once
    /// validation passes, the record is inserted and appointments scheduled
    /// after the off-study datetime are retracted atomically.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError`] for a failed validation rule or a concurrent
    ///   registration of the same subject
    /// - [`RetractionError::Protected`](crate::domain::RetractionError::Protected)
    ///   if an appointment cannot be deleted; nothing is persisted
    /// - [`OffstudyError::Storage`] for backend failures
    pub async fn register(&self, request: OffstudyRequest) -> Result<OffstudyRecord> {
        let subject_identifier = request.subject_identifier.clone();

        let result = match self.validate(&request).await {
            Ok(()) => self.persist(request.into_record()).await,
            Err(e) => Err(e),
        };

        match result {
            Ok((record, deleted)) => {
                tracing::info!(
                    subject_identifier = %record.subject_identifier,
                    offstudy_datetime = %self.calendar.format_datetime(record.offstudy_datetime),
                    reason = %record.reason,
                    appointments_deleted = deleted,
                    "Off-study registered"
                );
                Ok(record)
            }
            Err(e) => {
                log_rejection!(subject_identifier, &e, "register");
                Err(e)
            }
        }
    }

    async fn validate(&self, request: &OffstudyRequest) -> Result<()> {
        let subject_identifier = &request.subject_identifier;
        let offstudy_datetime = request.offstudy_datetime;

        if let Some(existing) = self.stores.offstudy_store.get(subject_identifier).await? {
            return Err(RegistrationError::AlreadyOffstudy {
                subject_identifier: subject_identifier.to_string(),
                offstudy_datetime: self.calendar.format_datetime(existing.offstudy_datetime),
            }
            .into());
        }

        let subject = self
            .stores
            .subject_registry
            .get(subject_identifier)
            .await?
            .filter(|subject| subject.registered)
            .ok_or_else(|| RegistrationError::SubjectNotRegistered {
                subject_identifier: subject_identifier.to_string(),
            })?;

        let consents = self.stores.consent_store.find(subject_identifier).await?;
        if consents.is_empty() {
            return Err(RegistrationError::NotConsented {
                subject_identifier: subject_identifier.to_string(),
            }
            .into());
        }
        let consent = consents
            .iter()
            .find(|consent| consent.consent_datetime <= offstudy_datetime)
            .ok_or_else(|| RegistrationError::InvalidOffstudyDatetimeConsent {
                offstudy_datetime: self.calendar.format_datetime(offstudy_datetime),
            })?;
        tracing::debug!(
            subject_identifier = %subject_identifier,
            consent_datetime = %self.calendar.format_datetime(consent.consent_datetime),
            "Consent found"
        );

        match subject.dob {
            Some(dob) if self.calendar.local_date(offstudy_datetime) < dob => {
                return Err(RegistrationError::OffstudyDatetimeBeforeDob {
                    offstudy_datetime: self.calendar.format_datetime(offstudy_datetime),
                }
                .into());
            }
            None if self.config.require_dob => {
                return Err(RegistrationError::InvalidDob {
                    subject_identifier: subject_identifier.to_string(),
                }
                .into());
            }
            _ => {}
        }

        if let Some(last_visit) = self.stores.visit_store.latest(subject_identifier).await? {
            if offstudy_datetime < last_visit.report_datetime {
                return Err(RegistrationError::OffstudyPrecedesLastVisit {
                    last_visit_datetime: self.calendar.format_datetime(last_visit.report_datetime),
                    offstudy_datetime: self.calendar.format_datetime(offstudy_datetime),
                }
                .into());
            }
        }

        self.validate_fields(request)
    }

    fn validate_fields(&self, request: &OffstudyRequest) -> Result<()> {
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(RegistrationError::MissingReason.into());
        }

        let reason_other_given = request
            .reason_other
            .as_deref()
            .map(|text| !text.trim().is_empty())
            .unwrap_or(false);
        if reason.eq_ignore_ascii_case(self.config.other_reason.trim()) && !reason_other_given {
            return Err(RegistrationError::ReasonOtherRequired.into());
        }

        let offstudy_datetime = request.offstudy_datetime;
        if !self.config.allow_future_datetime && offstudy_datetime > Utc::now() {
            return Err(RegistrationError::OffstudyDatetimeInFuture {
                offstudy_datetime: self.calendar.format_datetime(offstudy_datetime),
            }
            .into());
        }

        if let Some(study_open) = self.config.study_open_datetime {
            if offstudy_datetime < study_open {
                return Err(RegistrationError::OffstudyDatetimeBeforeStudyOpen {
                    study_open_datetime: self.calendar.format_datetime(study_open),
                    offstudy_datetime: self.calendar.format_datetime(offstudy_datetime),
                }
                .into());
            }
        }

        Ok(())
    }

    async fn persist(&self, record: OffstudyRecord) -> Result<(OffstudyRecord, usize)> {
        let mut tx = self.stores.schedule_store.begin().await?;

        if let Err(e) = tx.insert_offstudy(&record).await {
            return Err(abort(tx, e).await);
        }

        let deleted = match self
            .retractor
            .retract(&mut *tx, &record.subject_identifier, record.offstudy_datetime)
            .await
        {
            Ok(deleted) => deleted,
            Err(e) => return Err(abort(tx, e).await),
        };

        tx.commit().await?;
        Ok((record, deleted))
    }
}

async fn abort(tx: Box<dyn ScheduleTransaction>, error: OffstudyError) -> OffstudyError {
    if let Err(rollback_error) = tx.rollback().await {
        tracing::error!(error = %rollback_error, "Rollback failed");
    }
    error
}
