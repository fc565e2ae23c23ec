//! Integration tests for off-study registration

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use offstudy::adapters::memory::InMemoryStore;
use offstudy::adapters::storage::{OffstudyStore, Stores};
use offstudy::config::OffstudyConfig;
use offstudy::core::{OffstudyRequest, OffstudyService};
use offstudy::domain::{
    AppointmentRecord, ConsentRecord, OffstudyError, RegisteredSubject, RegistrationError,
    SubjectIdentifier, VisitOutcome, VisitRecord,
};
use std::sync::Arc;

fn subject() -> SubjectIdentifier {
    SubjectIdentifier::new("S-200").unwrap()
}

fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap() + Duration::days(n)
}

struct Fixture {
    store: InMemoryStore,
    service: OffstudyService,
}

async fn fixture_with(config: OffstudyConfig) -> Fixture {
    let store = InMemoryStore::new();
    store
        .add_subject(
            RegisteredSubject::new(subject())
                .with_dob(NaiveDate::from_ymd_opt(1985, 7, 14).unwrap())
                .with_registration_datetime(day(0)),
        )
        .await;
    store.add_consent(ConsentRecord::new(subject(), day(0))).await;

    let service = OffstudyService::new(&config, Stores::from_backend(Arc::new(store.clone()))).unwrap();
    Fixture { store, service }
}

async fn fixture() -> Fixture {
    fixture_with(OffstudyConfig::default()).await
}

fn registration_code(result: Result<impl std::fmt::Debug, OffstudyError>) -> &'static str {
    match result {
        Err(OffstudyError::Registration(e)) => e.code(),
        other => panic!("expected a registration error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_register_one_day_before_consent_fails() {
    let f = fixture().await;
    let result = f
        .service
        .register(OffstudyRequest::new(subject(), day(0) - Duration::days(1), "death"))
        .await;
    assert_eq!(registration_code(result), "invalid_offstudy_datetime_consent");
}

#[tokio::test]
async fn test_earliest_consent_satisfies_rule() {
    let f = fixture().await;
    // A later re-consent does not invalidate the original one
    f.store.add_consent(ConsentRecord::new(subject(), day(30))).await;

    assert!(f
        .service
        .register(OffstudyRequest::new(subject(), day(5), "death"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_last_visit_tie_is_allowed() {
    let f = fixture().await;
    f.store
        .add_visit(VisitRecord::new(subject(), day(7), VisitOutcome::Scheduled))
        .await
        .unwrap();

    let early = f
        .service
        .register(OffstudyRequest::new(
            subject(),
            day(7) - Duration::microseconds(1),
            "death",
        ))
        .await;
    assert_eq!(registration_code(early), "offstudy_precedes_last_visit");

    let record = f
        .service
        .register(OffstudyRequest::new(subject(), day(7), "death"))
        .await
        .unwrap();
    assert_eq!(record.offstudy_datetime, day(7));
}

#[tokio::test]
async fn test_second_registration_never_mutates() {
    let f = fixture().await;
    f.service
        .register(OffstudyRequest::new(subject(), day(10), "death").with_comment("first"))
        .await
        .unwrap();

    let second = f
        .service
        .register(OffstudyRequest::new(subject(), day(12), "withdrawn").with_comment("second"))
        .await;
    match second {
        Err(OffstudyError::Registration(RegistrationError::AlreadyOffstudy {
            subject_identifier,
            offstudy_datetime,
        })) => {
            assert_eq!(subject_identifier, "S-200");
            assert_eq!(offstudy_datetime, "2024-04-11 10:00");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let stored = f.store.get(&subject()).await.unwrap().unwrap();
    assert_eq!(stored.offstudy_datetime, day(10));
    assert_eq!(stored.comment.as_deref(), Some("first"));
}

#[tokio::test]
async fn test_concurrent_registrations_commit_once() {
    let f = fixture().await;
    let service = Arc::new(f.service);

    let mut handles = Vec::new();
    for offset in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .register(OffstudyRequest::new(subject(), day(10 + offset), "death"))
                .await
        }));
    }

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(e) => assert_eq!(e.code(), Some("already_offstudy")),
        }
    }
    assert_eq!(committed, 1);
}

#[tokio::test]
async fn test_study_open_datetime() {
    let mut config = OffstudyConfig::default();
    config.registration.study_open_datetime = Some(day(3));
    let f = fixture_with(config).await;

    let result = f
        .service
        .register(OffstudyRequest::new(subject(), day(2), "death"))
        .await;
    assert_eq!(registration_code(result), "offstudy_datetime_before_study_open");
    assert!(f.store.get(&subject()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_validation_failure_leaves_appointments() {
    let f = fixture().await;
    f.store
        .add_appointment(AppointmentRecord::new(subject(), day(20)))
        .await
        .unwrap();

    let result = f
        .service
        .register(OffstudyRequest::new(subject(), day(10), "other"))
        .await;
    assert_eq!(registration_code(result), "reason_other_required");
    assert_eq!(f.store.appointments_for(&subject()).await.len(), 1);
}
