//! Storage abstraction traits
//!
//! The engine reads subjects, consents, visits and off-study records through
//! the read traits and performs its only writes (off-study insert plus
//! appointment retraction) through a [`ScheduleTransaction`].

use crate::domain::ids::{AppointmentId, SubjectIdentifier};
use crate::domain::records::{
    AppointmentSummary, ConsentRecord, OffstudyRecord, RegisteredSubject, VisitRecord,
};
use crate::domain::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Subject registry lookups
#[async_trait]
pub trait SubjectRegistry: Send + Sync {
    /// Look up a subject by identifier
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the identifier is unknown.
    async fn get(&self, subject_identifier: &SubjectIdentifier) -> Result<Option<RegisteredSubject>>;
}

/// Consent lookups
#[async_trait]
pub trait ConsentStore: Send + Sync {
    /// All consents for a subject, ordered by consent datetime ascending
    async fn find(&self, subject_identifier: &SubjectIdentifier) -> Result<Vec<ConsentRecord>>;
}

/// Visit lookups
#[async_trait]
pub trait VisitStore: Send + Sync {
    /// All visits for a subject, ordered by report datetime ascending
    async fn find(&self, subject_identifier: &SubjectIdentifier) -> Result<Vec<VisitRecord>>;

    /// The visit with the latest report datetime, if any
    async fn latest(&self, subject_identifier: &SubjectIdentifier) -> Result<Option<VisitRecord>> {
        Ok(self.find(subject_identifier).await?.pop())
    }
}

/// Off-study record lookups
#[async_trait]
pub trait OffstudyStore: Send + Sync {
    /// The subject's off-study record, if one was committed
    async fn get(&self, subject_identifier: &SubjectIdentifier) -> Result<Option<OffstudyRecord>>;
}

/// Appointment queries and deletion within a transaction
#[async_trait]
pub trait AppointmentStore: Send {
    /// Appointments of the subject scheduled strictly after `cutoff`, ascending
    async fn find_after(
        &mut self,
        subject_identifier: &SubjectIdentifier,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AppointmentSummary>>;

    /// Delete an appointment
    ///
    /// # Errors
    ///
    /// Returns [`RetractionError::Protected`](crate::domain::RetractionError::Protected)
    /// if captured data still references the appointment.
    async fn delete(&mut self, id: &AppointmentId) -> Result<()>;
}

/// A single all-or-nothing unit of work
///
/// Dropping a transaction without calling [`commit`](Self::commit) rolls it back.
#[async_trait]
pub trait ScheduleTransaction: AppointmentStore {
    /// Insert the off-study record
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::AlreadyOffstudy`](crate::domain::RegistrationError::AlreadyOffstudy)
    /// if the subject already has a record.
    async fn insert_offstudy(&mut self, record: &OffstudyRecord) -> Result<()>;

    /// Make every change of this transaction durable
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard every change of this transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Entry point for transactional writes
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Start a transaction
    async fn begin(&self) -> Result<Box<dyn ScheduleTransaction>>;
}

/// The collaborators the engine is constructed with
///
/// Passed explicitly at construction; nothing is looked up globally.
#[derive(Clone)]
pub struct Stores {
    pub subject_registry: Arc<dyn SubjectRegistry>,
    pub consent_store: Arc<dyn ConsentStore>,
    pub visit_store: Arc<dyn VisitStore>,
    pub offstudy_store: Arc<dyn OffstudyStore>,
    pub schedule_store: Arc<dyn ScheduleStore>,
}

impl Stores {
    /// Use one backend for every collaborator
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: SubjectRegistry + ConsentStore + VisitStore + OffstudyStore + ScheduleStore + 'static,
    {
        Self {
            subject_registry: backend.clone(),
            consent_store: backend.clone(),
            visit_store: backend.clone(),
            offstudy_store: backend.clone(),
            schedule_store: backend,
        }
    }
}
