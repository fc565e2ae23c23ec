//! Eligibility checks for scheduled data
//!
//! Every write of scheduled data for a subject first asks the
//! [`EligibilityChecker`] whether the report may be captured.

use crate::adapters::storage::traits::{
    ConsentStore, OffstudyStore, Stores, SubjectRegistry, VisitStore,
};
use crate::config::schema::{BoundaryPolicy, EligibilityConfig};
use crate::core::calendar::LocalCalendar;
use crate::domain::guard::HasOffstudyGuard;
use crate::domain::ids::{SubjectIdentifier, VisitId};
use crate::domain::{OffstudyError, OffstudyViolation, Result};
use crate::log_rejection;
use chrono::{DateTime, Utc};

/// Rejects scheduled data reported after a subject went off study
///
/// Reads only; never modifies a store.
pub struct EligibilityChecker {
    config: EligibilityConfig,
    calendar: LocalCalendar,
    stores: Stores,
}

impl EligibilityChecker {
    /// Create a checker
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the timezone offset is out of range.
    pub fn new(config: EligibilityConfig, stores: Stores) -> Result<Self> {
        let calendar = LocalCalendar::from_offset_minutes(config.timezone_offset_minutes)?;
        Ok(Self {
            config,
            calendar,
            stores,
        })
    }

    pub fn calendar(&self) -> &LocalCalendar {
        &self.calendar
    }

    /// Check whether a report dated `report_datetime` may be captured
    ///
    /// `compare_as_datetime` selects full-timestamp comparison; `None` uses
    /// the configured default.
    ///
    /// # Errors
    ///
    /// - [`OffstudyError::SubjectNotFound`] for unknown or unregistered subjects
    /// - [`OffstudyViolation::BeforeRegistration`] if the report precedes registration
    /// - [`OffstudyViolation::BeforeConsent`] if no consent precedes the report
    /// - [`OffstudyViolation::ReportedOffstudy`] if the subject is off study
    ///   as of the report
    /// - [`OffstudyViolation::TerminalVisit`] if an earlier visit ended with a
    ///   terminal outcome
    pub async fn check(
        &self,
        subject_identifier: &SubjectIdentifier,
        report_datetime: DateTime<Utc>,
        compare_as_datetime: Option<bool>,
    ) -> Result<()> {
        self.evaluate(subject_identifier, report_datetime, compare_as_datetime, None)
            .await
    }

    /// Check a record carrying the off-study guard capability
    ///
    /// A visit is never checked against itself.
    pub async fn check_record<R>(&self, record: &R) -> Result<()>
    where
        R: HasOffstudyGuard + Sync + ?Sized,
    {
        self.evaluate(
            record.subject_identifier(),
            record.report_datetime(),
            record.compare_as_datetime(),
            record.visit_id(),
        )
        .await
    }

    async fn evaluate(
        &self,
        subject_identifier: &SubjectIdentifier,
        report_datetime: DateTime<Utc>,
        compare_as_datetime: Option<bool>,
        own_visit: Option<&VisitId>,
    ) -> Result<()> {
        let as_datetime = compare_as_datetime.unwrap_or(self.config.compare_as_datetime);

        let subject = match self.stores.subject_registry.get(subject_identifier).await? {
            Some(subject) if subject.registered => subject,
            _ => {
                let error = OffstudyError::SubjectNotFound(subject_identifier.to_string());
                log_rejection!(subject_identifier, &error, "check");
                return Err(error);
            }
        };

        if let Some(registered_at) = subject.registration_datetime {
            if !self
                .calendar
                .at_or_before(registered_at, report_datetime, as_datetime)
            {
                return Err(self.reject(
                    subject_identifier,
                    OffstudyViolation::BeforeRegistration {
                        subject_identifier: subject_identifier.to_string(),
                        registration_date: self.calendar.format_for_mode(registered_at, as_datetime),
                        report_date: self.calendar.format_for_mode(report_datetime, as_datetime),
                    },
                ));
            }
        }

        let consents = self.stores.consent_store.find(subject_identifier).await?;
        let consented = consents.iter().any(|consent| {
            self.calendar
                .at_or_before(consent.consent_datetime, report_datetime, as_datetime)
        });
        if !consented {
            return Err(self.reject(
                subject_identifier,
                OffstudyViolation::BeforeConsent {
                    subject_identifier: subject_identifier.to_string(),
                    report_date: self.calendar.format_for_mode(report_datetime, as_datetime),
                },
            ));
        }

        if let Some(record) = self.stores.offstudy_store.get(subject_identifier).await? {
            let offstudy_datetime = record.offstudy_datetime;
            let rejected = match self.config.boundary {
                BoundaryPolicy::Inclusive => {
                    self.calendar
                        .at_or_before(offstudy_datetime, report_datetime, as_datetime)
                }
                BoundaryPolicy::Exclusive => {
                    self.calendar
                        .after(report_datetime, offstudy_datetime, as_datetime)
                }
            };
            if rejected {
                return Err(self.reject(
                    subject_identifier,
                    OffstudyViolation::ReportedOffstudy {
                        subject_identifier: subject_identifier.to_string(),
                        offstudy_date: self
                            .calendar
                            .format_for_mode(offstudy_datetime, as_datetime),
                    },
                ));
            }
        }

        // Terminal visits end participation at their instant, whatever the mode
        let visits = self.stores.visit_store.find(subject_identifier).await?;
        let terminal = visits.iter().find(|visit| {
            Some(&visit.id) != own_visit
                && self.config.terminal_outcomes.contains(&visit.outcome)
                && report_datetime > visit.report_datetime
        });
        if let Some(visit) = terminal {
            return Err(self.reject(
                subject_identifier,
                OffstudyViolation::TerminalVisit {
                    subject_identifier: subject_identifier.to_string(),
                    outcome: visit.outcome.to_string(),
                    visit_date: self.calendar.format_date(visit.report_datetime),
                },
            ));
        }

        tracing::debug!(
            subject_identifier = %subject_identifier,
            report_datetime = %self.calendar.format_datetime(report_datetime),
            compare_as_datetime = as_datetime,
            "Eligibility check passed"
        );

        Ok(())
    }

    fn reject(
        &self,
        subject_identifier: &SubjectIdentifier,
        violation: OffstudyViolation,
    ) -> OffstudyError {
        let error = OffstudyError::from(violation);
        log_rejection!(subject_identifier, &error, "check");
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::adapters::storage::traits::{ScheduleStore, ScheduleTransaction};
    use crate::domain::records::{
        ConsentRecord, OffstudyRecord, RegisteredSubject, VisitOutcome, VisitRecord,
    };
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn subject() -> SubjectIdentifier {
        SubjectIdentifier::new("S-001").unwrap()
    }

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() + Duration::days(n)
    }

    async fn consented_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.add_subject(RegisteredSubject::new(subject())).await;
        store.add_consent(ConsentRecord::new(subject(), day(0))).await;
        store
    }

    async fn put_offstudy(store: &InMemoryStore, at: DateTime<Utc>) {
        let mut tx = store.begin().await.unwrap();
        tx.insert_offstudy(&OffstudyRecord {
            subject_identifier: subject(),
            offstudy_datetime: at,
            reason: "death".to_string(),
            reason_other: None,
            comment: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();
    }

    fn checker(store: &InMemoryStore, config: EligibilityConfig) -> EligibilityChecker {
        EligibilityChecker::new(config, Stores::from_backend(Arc::new(store.clone()))).unwrap()
    }

    #[tokio::test]
    async fn test_passes_without_offstudy_record() {
        let store = consented_store().await;
        let checker = checker(&store, EligibilityConfig::default());
        assert!(checker.check(&subject(), day(30), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_subject() {
        let store = InMemoryStore::new();
        let checker = checker(&store, EligibilityConfig::default());
        let err = checker.check(&subject(), day(1), None).await.unwrap_err();
        assert!(matches!(err, OffstudyError::SubjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_unregistered_subject() {
        let store = InMemoryStore::new();
        store
            .add_subject(RegisteredSubject::new(subject()).unregistered())
            .await;
        let checker = checker(&store, EligibilityConfig::default());
        let err = checker.check(&subject(), day(1), None).await.unwrap_err();
        assert!(matches!(err, OffstudyError::SubjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_report_before_consent() {
        let store = InMemoryStore::new();
        store.add_subject(RegisteredSubject::new(subject())).await;
        store.add_consent(ConsentRecord::new(subject(), day(5))).await;
        let checker = checker(&store, EligibilityConfig::default());

        let err = checker.check(&subject(), day(4), None).await.unwrap_err();
        assert_eq!(err.code(), Some("offstudy_before_consent"));
        assert!(checker.check(&subject(), day(5), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_after_offstudy_is_rejected_with_date() {
        let store = consented_store().await;
        put_offstudy(&store, day(10)).await;
        let checker = checker(&store, EligibilityConfig::default());

        let err = checker.check(&subject(), day(20), None).await.unwrap_err();
        assert_eq!(err.code(), Some("offstudy"));
        assert!(err.to_string().contains("2024-01-11"));
    }

    #[tokio::test]
    async fn test_same_day_is_rejected_by_default() {
        let store = consented_store().await;
        put_offstudy(&store, day(10)).await;
        let checker = checker(&store, EligibilityConfig::default());

        let earlier_same_day = day(10) - Duration::hours(2);
        assert!(checker.check(&subject(), earlier_same_day, None).await.is_err());
        assert!(checker.check(&subject(), day(9), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_exclusive_boundary_admits_off_study_day() {
        let store = consented_store().await;
        put_offstudy(&store, day(10)).await;
        let config = EligibilityConfig {
            boundary: BoundaryPolicy::Exclusive,
            ..EligibilityConfig::default()
        };
        let checker = checker(&store, config);

        assert!(checker.check(&subject(), day(10) + Duration::hours(3), None).await.is_ok());
        assert!(checker.check(&subject(), day(11), None).await.is_err());
    }

    #[tokio::test]
    async fn test_datetime_mode_compares_instants() {
        let store = consented_store().await;
        put_offstudy(&store, day(10)).await;
        let checker = checker(&store, EligibilityConfig::default());

        let before = day(10) - Duration::minutes(1);
        assert!(checker.check(&subject(), before, Some(true)).await.is_ok());
        assert!(checker.check(&subject(), before, Some(false)).await.is_err());

        let err = checker.check(&subject(), day(10), Some(true)).await.unwrap_err();
        assert!(err.to_string().contains("2024-01-11 09:00"));
    }

    #[tokio::test]
    async fn test_terminal_visit_blocks_later_reports() {
        let store = consented_store().await;
        store
            .add_visit(VisitRecord::new(subject(), day(3), VisitOutcome::Death))
            .await
            .unwrap();
        let checker = checker(&store, EligibilityConfig::default());

        let err = checker.check(&subject(), day(4), None).await.unwrap_err();
        assert_eq!(err.code(), Some("offstudy_terminal_visit"));
        assert!(err.to_string().contains("death"));
        assert!(checker.check(&subject(), day(3), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_terminal_visit_blocks_later_same_day_reports() {
        let store = consented_store().await;
        store
            .add_visit(VisitRecord::new(subject(), day(3), VisitOutcome::Death))
            .await
            .unwrap();
        let checker = checker(&store, EligibilityConfig::default());

        let later_same_day = day(3) + Duration::hours(5);
        let err = checker.check(&subject(), later_same_day, None).await.unwrap_err();
        assert_eq!(err.code(), Some("offstudy_terminal_visit"));
        assert!(checker
            .check(&subject(), day(3) - Duration::hours(1), None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_terminal_visit_is_not_checked_against_itself() {
        let store = consented_store().await;
        let visit = VisitRecord::new(subject(), day(3), VisitOutcome::Death);
        store.add_visit(visit.clone()).await.unwrap();
        let checker = checker(&store, EligibilityConfig::default());

        assert!(checker.check_record(&visit).await.is_ok());

        let later = VisitRecord::new(subject(), day(3) + Duration::hours(1), VisitOutcome::Scheduled);
        assert!(checker.check_record(&later).await.is_err());
    }

    #[tokio::test]
    async fn test_report_before_registration() {
        let store = InMemoryStore::new();
        store
            .add_subject(RegisteredSubject::new(subject()).with_registration_datetime(day(2)))
            .await;
        store.add_consent(ConsentRecord::new(subject(), day(0))).await;
        let checker = checker(&store, EligibilityConfig::default());

        let err = checker.check(&subject(), day(1), None).await.unwrap_err();
        assert_eq!(err.code(), Some("offstudy_before_registration"));
        assert!(err.to_string().contains("2024-01-03"));

        let same_day = day(2) - Duration::hours(1);
        assert!(checker.check(&subject(), same_day, None).await.is_ok());
        assert!(checker.check(&subject(), same_day, Some(true)).await.is_err());
    }

    #[tokio::test]
    async fn test_non_terminal_visit_does_not_block() {
        let store = consented_store().await;
        store
            .add_visit(VisitRecord::new(subject(), day(3), VisitOutcome::Missed))
            .await
            .unwrap();
        let checker = checker(&store, EligibilityConfig::default());
        assert!(checker.check(&subject(), day(4), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_check_record_uses_visit() {
        let store = consented_store().await;
        put_offstudy(&store, day(10)).await;
        let checker = checker(&store, EligibilityConfig::default());

        let visit = VisitRecord::new(subject(), day(12), VisitOutcome::Scheduled);
        assert!(checker.check_record(&visit).await.is_err());
    }
}
