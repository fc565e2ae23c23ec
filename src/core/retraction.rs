//! Appointment retraction
//!
//! Deletes a subject's future appointments once the subject is off study.
//! Runs inside the registration transaction; it never commits on its own.

use crate::adapters::storage::traits::AppointmentStore;
use crate::core::calendar::LocalCalendar;
use crate::domain::ids::SubjectIdentifier;
use crate::domain::Result;
use chrono::{DateTime, Utc};

/// Removes appointments scheduled after an off-study cutoff
#[derive(Debug, Clone, Default)]
pub struct AppointmentRetractor {
    calendar: LocalCalendar,
}

impl AppointmentRetractor {
    pub fn new(calendar: LocalCalendar) -> Self {
        Self { calendar }
    }

    /// Delete the subject's appointments scheduled strictly after `cutoff`
    ///
    /// Appointments with a captured visit are skipped. Returns the number
    /// deleted, which may be zero.
    ///
    /// # Errors
    ///
    /// Returns [`RetractionError::Protected`](crate::domain::RetractionError::Protected)
    /// from the store when an appointment is still referenced. Earlier
    /// deletions are left in the transaction for the caller to roll back.
    pub async fn retract<S>(
        &self,
        store: &mut S,
        subject_identifier: &SubjectIdentifier,
        cutoff: DateTime<Utc>,
    ) -> Result<usize>
    where
        S: AppointmentStore + ?Sized,
    {
        let candidates = store.find_after(subject_identifier, cutoff).await?;
        let mut deleted = 0;

        for appointment in candidates {
            if appointment.has_visit {
                tracing::debug!(
                    subject_identifier = %subject_identifier,
                    appointment_id = %appointment.id,
                    "Skipping appointment with captured visit"
                );
                continue;
            }

            store.delete(&appointment.id).await?;
            deleted += 1;

            tracing::debug!(
                subject_identifier = %subject_identifier,
                appointment_id = %appointment.id,
                scheduled_datetime = %self.calendar.format_datetime(appointment.scheduled_datetime),
                "Deleted appointment"
            );
        }

        tracing::info!(
            subject_identifier = %subject_identifier,
            cutoff = %self.calendar.format_datetime(cutoff),
            deleted,
            "Retracted appointments"
        );

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::AppointmentId;
    use crate::domain::records::AppointmentSummary;
    use crate::domain::{OffstudyError, RetractionError};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    /// Appointment store over a plain vector
    struct VecStore {
        subject: SubjectIdentifier,
        appointments: Vec<AppointmentSummary>,
        protected: Vec<AppointmentId>,
        deleted: Vec<AppointmentId>,
    }

    #[async_trait]
    impl AppointmentStore for VecStore {
        async fn find_after(
            &mut self,
            subject_identifier: &SubjectIdentifier,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<AppointmentSummary>> {
            if *subject_identifier != self.subject {
                return Ok(Vec::new());
            }
            Ok(self
                .appointments
                .iter()
                .filter(|a| a.scheduled_datetime > cutoff)
                .cloned()
                .collect())
        }

        async fn delete(&mut self, id: &AppointmentId) -> Result<()> {
            if self.protected.contains(id) {
                return Err(OffstudyError::Retraction(RetractionError::Protected {
                    appointment_id: id.to_string(),
                    scheduled_datetime: String::new(),
                    references: "lab requisition".to_string(),
                }));
            }
            self.appointments.retain(|a| &a.id != id);
            self.deleted.push(id.clone());
            Ok(())
        }
    }

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() + Duration::days(n)
    }

    fn summary(id: &str, at: DateTime<Utc>, has_visit: bool) -> AppointmentSummary {
        AppointmentSummary {
            id: AppointmentId::new(id).unwrap(),
            scheduled_datetime: at,
            has_visit,
        }
    }

    fn vec_store(appointments: Vec<AppointmentSummary>) -> VecStore {
        VecStore {
            subject: SubjectIdentifier::new("S-001").unwrap(),
            appointments,
            protected: Vec::new(),
            deleted: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_deletes_only_after_cutoff() {
        let mut store = vec_store(vec![
            summary("A-0", day(0), true),
            summary("A-10", day(10), false),
            summary("A-14", day(14), false),
            summary("A-21", day(21), false),
        ]);
        let subject = store.subject.clone();

        let deleted = AppointmentRetractor::default()
            .retract(&mut store, &subject, day(10))
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        let ids: Vec<&str> = store.deleted.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["A-14", "A-21"]);
    }

    #[tokio::test]
    async fn test_skips_appointments_with_visits() {
        let mut store = vec_store(vec![
            summary("A-14", day(14), true),
            summary("A-21", day(21), false),
        ]);
        let subject = store.subject.clone();

        let deleted = AppointmentRetractor::default()
            .retract(&mut store, &subject, day(10))
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(store.appointments.len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_to_delete() {
        let mut store = vec_store(vec![summary("A-0", day(0), false)]);
        let subject = store.subject.clone();

        let deleted = AppointmentRetractor::default()
            .retract(&mut store, &subject, day(10))
            .await
            .unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn test_other_subject_untouched() {
        let mut store = vec_store(vec![summary("A-21", day(21), false)]);
        let other = SubjectIdentifier::new("S-002").unwrap();

        let deleted = AppointmentRetractor::default()
            .retract(&mut store, &other, day(10))
            .await
            .unwrap();
        assert_eq!(deleted, 0);
        assert!(store.deleted.is_empty());
    }

    #[tokio::test]
    async fn test_protected_appointment_fails() {
        let mut store = vec_store(vec![
            summary("A-14", day(14), false),
            summary("A-21", day(21), false),
        ]);
        store.protected.push(AppointmentId::new("A-21").unwrap());
        let subject = store.subject.clone();

        let err = AppointmentRetractor::default()
            .retract(&mut store, &subject, day(10))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("protected"));
    }
}
