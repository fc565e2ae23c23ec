//! In-memory store implementing every storage trait
//!
//! Transactions hold the store lock for their whole lifetime, which
//! serializes writers, and restore a snapshot unless committed.

use crate::adapters::memory::dataset::Dataset;
use crate::adapters::storage::traits::{
    AppointmentStore, ConsentStore, OffstudyStore, ScheduleStore, ScheduleTransaction,
    SubjectRegistry, VisitStore,
};
use crate::domain::ids::{AppointmentId, SubjectIdentifier};
use crate::domain::records::{
    AppointmentRecord, AppointmentSummary, ConsentRecord, OffstudyRecord, RegisteredSubject,
    VisitRecord, DATETIME_FORMAT,
};
use crate::domain::{OffstudyError, RegistrationError, Result, RetractionError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct Ledger {
    subjects: HashMap<SubjectIdentifier, RegisteredSubject>,
    consents: Vec<ConsentRecord>,
    visits: Vec<VisitRecord>,
    appointments: BTreeMap<AppointmentId, AppointmentRecord>,
    offstudy: HashMap<SubjectIdentifier, OffstudyRecord>,
}

impl Ledger {
    fn insert_visit(&mut self, visit: VisitRecord) -> Result<()> {
        if let Some(appointment_id) = &visit.appointment_id {
            let appointment = self.appointments.get_mut(appointment_id).ok_or_else(|| {
                OffstudyError::Storage(format!(
                    "Visit {} references unknown appointment {}",
                    visit.id, appointment_id
                ))
            })?;
            if appointment.subject_identifier != visit.subject_identifier {
                return Err(OffstudyError::Storage(format!(
                    "Visit {} and appointment {} belong to different subjects",
                    visit.id, appointment_id
                )));
            }
            let conflicting = appointment
                .linked_visit
                .as_ref()
                .filter(|id| **id != visit.id);
            if let Some(existing) = conflicting {
                return Err(OffstudyError::Storage(format!(
                    "Appointment {} already has visit {}",
                    appointment_id, existing
                )));
            }
            appointment.linked_visit = Some(visit.id.clone());
        }
        self.visits.push(visit);
        Ok(())
    }

    fn insert_appointment(&mut self, appointment: AppointmentRecord) -> Result<()> {
        if self.appointments.contains_key(&appointment.id) {
            return Err(OffstudyError::Storage(format!(
                "Duplicate appointment id {}",
                appointment.id
            )));
        }
        self.appointments.insert(appointment.id.clone(), appointment);
        Ok(())
    }

    fn insert_offstudy(&mut self, record: &OffstudyRecord) -> Result<()> {
        if let Some(existing) = self.offstudy.get(&record.subject_identifier) {
            return Err(RegistrationError::AlreadyOffstudy {
                subject_identifier: existing.subject_identifier.to_string(),
                offstudy_datetime: existing.offstudy_datetime.format(DATETIME_FORMAT).to_string(),
            }
            .into());
        }
        self.offstudy
            .insert(record.subject_identifier.clone(), record.clone());
        Ok(())
    }

    fn delete_appointment(&mut self, id: &AppointmentId) -> Result<()> {
        let appointment = self
            .appointments
            .get(id)
            .ok_or_else(|| OffstudyError::Storage(format!("Appointment {id} not found")))?;

        let mut references: Vec<String> = appointment.protected_by.clone();
        if let Some(visit_id) = &appointment.linked_visit {
            references.push(format!("visit {visit_id}"));
        }
        if !references.is_empty() {
            return Err(RetractionError::Protected {
                appointment_id: id.to_string(),
                scheduled_datetime: appointment
                    .scheduled_datetime
                    .format(DATETIME_FORMAT)
                    .to_string(),
                references: references.join(", "),
            }
            .into());
        }

        self.appointments.remove(id);
        Ok(())
    }

    fn find_after(
        &self,
        subject_identifier: &SubjectIdentifier,
        cutoff: DateTime<Utc>,
    ) -> Vec<AppointmentSummary> {
        let mut found: Vec<AppointmentSummary> = self
            .appointments
            .values()
            .filter(|a| &a.subject_identifier == subject_identifier && a.scheduled_datetime > cutoff)
            .map(AppointmentSummary::from)
            .collect();
        found.sort_by_key(|a| a.scheduled_datetime);
        found
    }
}

/// In-memory backend
///
/// Cloning is cheap; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    ledger: Arc<Mutex<Ledger>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the contents of a dataset
    ///
    /// Appointments are loaded before visits so visit links resolve.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate ids, dangling visit links or more than
    /// one off-study record per subject.
    pub fn from_dataset(dataset: Dataset) -> Result<Self> {
        let mut ledger = Ledger::default();
        for subject in dataset.subjects {
            ledger
                .subjects
                .insert(subject.subject_identifier.clone(), subject);
        }
        ledger.consents = dataset.consents;
        for appointment in dataset.appointments {
            ledger.insert_appointment(appointment)?;
        }
        for visit in dataset.visits {
            ledger.insert_visit(visit)?;
        }
        for record in &dataset.offstudy {
            ledger.insert_offstudy(record)?;
        }

        Ok(Self {
            ledger: Arc::new(Mutex::new(ledger)),
        })
    }

    /// Copy the current contents into a dataset
    pub async fn snapshot(&self) -> Dataset {
        let ledger = self.ledger.lock().await;
        let mut subjects: Vec<RegisteredSubject> = ledger.subjects.values().cloned().collect();
        subjects.sort_by(|a, b| a.subject_identifier.cmp(&b.subject_identifier));
        let mut offstudy: Vec<OffstudyRecord> = ledger.offstudy.values().cloned().collect();
        offstudy.sort_by(|a, b| a.subject_identifier.cmp(&b.subject_identifier));

        Dataset {
            subjects,
            consents: ledger.consents.clone(),
            visits: ledger.visits.clone(),
            appointments: ledger.appointments.values().cloned().collect(),
            offstudy,
        }
    }

    pub async fn add_subject(&self, subject: RegisteredSubject) {
        let mut ledger = self.ledger.lock().await;
        ledger
            .subjects
            .insert(subject.subject_identifier.clone(), subject);
    }

    pub async fn add_consent(&self, consent: ConsentRecord) {
        self.ledger.lock().await.consents.push(consent);
    }

    /// Record a visit, linking it to its appointment if one is given
    ///
    /// The eligibility check is the caller's responsibility.
    pub async fn add_visit(&self, visit: VisitRecord) -> Result<()> {
        self.ledger.lock().await.insert_visit(visit)
    }

    pub async fn add_appointment(&self, appointment: AppointmentRecord) -> Result<()> {
        self.ledger.lock().await.insert_appointment(appointment)
    }

    /// Appointments of a subject ordered by scheduled datetime
    pub async fn appointments_for(
        &self,
        subject_identifier: &SubjectIdentifier,
    ) -> Vec<AppointmentRecord> {
        let ledger = self.ledger.lock().await;
        let mut appointments: Vec<AppointmentRecord> = ledger
            .appointments
            .values()
            .filter(|a| &a.subject_identifier == subject_identifier)
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.scheduled_datetime);
        appointments
    }

    pub async fn appointment_count(&self) -> usize {
        self.ledger.lock().await.appointments.len()
    }
}

#[async_trait]
impl SubjectRegistry for InMemoryStore {
    async fn get(&self, subject_identifier: &SubjectIdentifier) -> Result<Option<RegisteredSubject>> {
        Ok(self.ledger.lock().await.subjects.get(subject_identifier).cloned())
    }
}

#[async_trait]
impl ConsentStore for InMemoryStore {
    async fn find(&self, subject_identifier: &SubjectIdentifier) -> Result<Vec<ConsentRecord>> {
        let ledger = self.ledger.lock().await;
        let mut consents: Vec<ConsentRecord> = ledger
            .consents
            .iter()
            .filter(|c| &c.subject_identifier == subject_identifier)
            .cloned()
            .collect();
        consents.sort_by_key(|c| c.consent_datetime);
        Ok(consents)
    }
}

#[async_trait]
impl VisitStore for InMemoryStore {
    async fn find(&self, subject_identifier: &SubjectIdentifier) -> Result<Vec<VisitRecord>> {
        let ledger = self.ledger.lock().await;
        let mut visits: Vec<VisitRecord> = ledger
            .visits
            .iter()
            .filter(|v| &v.subject_identifier == subject_identifier)
            .cloned()
            .collect();
        visits.sort_by_key(|v| v.report_datetime);
        Ok(visits)
    }
}

#[async_trait]
impl OffstudyStore for InMemoryStore {
    async fn get(&self, subject_identifier: &SubjectIdentifier) -> Result<Option<OffstudyRecord>> {
        Ok(self.ledger.lock().await.offstudy.get(subject_identifier).cloned())
    }
}

#[async_trait]
impl ScheduleStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn ScheduleTransaction>> {
        let guard = self.ledger.clone().lock_owned().await;
        let backup = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            backup: Some(backup),
        }))
    }
}

/// Transaction over the in-memory store
///
/// Holds the store lock until committed or dropped.
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Ledger>,
    backup: Option<Ledger>,
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if let Some(backup) = self.backup.take() {
            *self.guard = backup;
        }
    }
}

#[async_trait]
impl AppointmentStore for InMemoryTransaction {
    async fn find_after(
        &mut self,
        subject_identifier: &SubjectIdentifier,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AppointmentSummary>> {
        Ok(self.guard.find_after(subject_identifier, cutoff))
    }

    async fn delete(&mut self, id: &AppointmentId) -> Result<()> {
        self.guard.delete_appointment(id)
    }
}

#[async_trait]
impl ScheduleTransaction for InMemoryTransaction {
    async fn insert_offstudy(&mut self, record: &OffstudyRecord) -> Result<()> {
        self.guard.insert_offstudy(record)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut tx = self;
        tx.backup = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        drop(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn subject(id: &str) -> SubjectIdentifier {
        SubjectIdentifier::new(id).unwrap()
    }

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() + Duration::days(n)
    }

    fn record(id: &str, at: DateTime<Utc>) -> OffstudyRecord {
        OffstudyRecord {
            subject_identifier: subject(id),
            offstudy_datetime: at,
            reason: "death".to_string(),
            reason_other: None,
            comment: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_uncommitted_transaction_rolls_back_on_drop() {
        let store = InMemoryStore::new();
        let appointment = AppointmentRecord::new(subject("S-1"), day(14));
        let appointment_id = appointment.id.clone();
        store.add_appointment(appointment).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_offstudy(&record("S-1", day(10))).await.unwrap();
            tx.delete(&appointment_id).await.unwrap();
        }

        assert!(OffstudyStore::get(&store, &subject("S-1")).await.unwrap().is_none());
        assert_eq!(store.appointment_count().await, 1);
    }

    #[tokio::test]
    async fn test_commit_persists_changes() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_offstudy(&record("S-1", day(10))).await.unwrap();
        tx.commit().await.unwrap();

        let stored = OffstudyStore::get(&store, &subject("S-1")).await.unwrap();
        assert_eq!(stored.map(|r| r.offstudy_datetime), Some(day(10)));
    }

    #[tokio::test]
    async fn test_explicit_rollback() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_offstudy(&record("S-1", day(10))).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(OffstudyStore::get(&store, &subject("S-1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_insert_is_a_conflict() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_offstudy(&record("S-1", day(10))).await.unwrap();
        let err = tx.insert_offstudy(&record("S-1", day(12))).await.unwrap_err();
        assert_eq!(err.code(), Some("already_offstudy"));
    }

    #[tokio::test]
    async fn test_linked_appointment_is_protected() {
        let store = InMemoryStore::new();
        let appointment = AppointmentRecord::new(subject("S-1"), day(7));
        let appointment_id = appointment.id.clone();
        store.add_appointment(appointment).await.unwrap();
        store
            .add_visit(
                VisitRecord::new(subject("S-1"), day(7), crate::domain::VisitOutcome::Scheduled)
                    .with_appointment(appointment_id.clone()),
            )
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = tx.delete(&appointment_id).await.unwrap_err();
        assert_eq!(err.code(), Some("protected"));
    }

    #[tokio::test]
    async fn test_find_after_is_strict_and_subject_scoped() {
        let store = InMemoryStore::new();
        store
            .add_appointment(AppointmentRecord::new(subject("S-1"), day(10)))
            .await
            .unwrap();
        store
            .add_appointment(AppointmentRecord::new(subject("S-1"), day(11)))
            .await
            .unwrap();
        store
            .add_appointment(AppointmentRecord::new(subject("S-2"), day(11)))
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        let found = tx.find_after(&subject("S-1"), day(10)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].scheduled_datetime, day(11));
    }

    #[tokio::test]
    async fn test_visit_with_unknown_appointment_is_rejected() {
        let store = InMemoryStore::new();
        let visit = VisitRecord::new(subject("S-1"), day(1), crate::domain::VisitOutcome::Scheduled)
            .with_appointment(AppointmentId::new("missing").unwrap());
        assert!(store.add_visit(visit).await.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_with_linked_visit_reloads() {
        let store = InMemoryStore::new();
        let appointment = AppointmentRecord::new(subject("S-1"), day(7));
        let appointment_id = appointment.id.clone();
        store.add_appointment(appointment).await.unwrap();
        store
            .add_visit(
                VisitRecord::new(subject("S-1"), day(7), crate::domain::VisitOutcome::Scheduled)
                    .with_appointment(appointment_id.clone()),
            )
            .await
            .unwrap();

        let restored = InMemoryStore::from_dataset(store.snapshot().await).unwrap();
        let appointments = restored.appointments_for(&subject("S-1")).await;
        assert!(appointments[0].has_visit());
    }

    #[tokio::test]
    async fn test_snapshot_round_trips_dataset() {
        let store = InMemoryStore::new();
        store.add_subject(RegisteredSubject::new(subject("S-1"))).await;
        store
            .add_consent(ConsentRecord::new(subject("S-1"), day(0)))
            .await;

        let snapshot = store.snapshot().await;
        let restored = InMemoryStore::from_dataset(snapshot.clone()).unwrap();
        assert_eq!(restored.snapshot().await, snapshot);
    }
}
