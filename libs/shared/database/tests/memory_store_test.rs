use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use uuid::Uuid;

use shared_database::{
    AppointmentChange, BookingStore, BookingTransition, InMemoryStore, PracticeFilter, SlotFilter,
    StoreError,
};
use shared_models::entities::*;

struct Fixture {
    store: Arc<InMemoryStore>,
    practice: Practice,
    dentist: Dentist,
    routine: Treatment,
    urgent: Treatment,
    patient: User,
}

async fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::new());

    let practice = store
        .insert_practice(NewPractice {
            name: "Harbour Dental".to_string(),
            address: "1 Quay Street".to_string(),
            postcode: "BS1 4DJ".to_string(),
            latitude: 51.45,
            longitude: -2.59,
            phone: "0117 000 0000".to_string(),
            email: "front-desk@harbour.example".to_string(),
            practice_tag: "HARBOUR-1234".to_string(),
            rating: 4.7,
            accessibility: AccessibilityFeatures {
                wheelchair_access: true,
                ..Default::default()
            },
        })
        .await
        .unwrap();

    let dentist = store
        .insert_dentist(NewDentist {
            practice_id: practice.id,
            title: "Dr.".to_string(),
            full_name: "Ada Molar".to_string(),
            specialization: "General".to_string(),
            experience_years: 12,
            languages: vec!["English".to_string()],
            available_days: vec![1, 2, 3, 4, 5],
        })
        .await
        .unwrap();

    let routine = store
        .insert_treatment(NewTreatment {
            name: "Check-up".to_string(),
            category: TreatmentCategory::Routine,
            duration_minutes: 30,
            price_pence: 2500,
        })
        .await
        .unwrap();

    let urgent = store
        .insert_treatment(NewTreatment {
            name: "Toothache".to_string(),
            category: TreatmentCategory::Urgent,
            duration_minutes: 20,
            price_pence: 4000,
        })
        .await
        .unwrap();

    let patient = store
        .insert_user(NewUser {
            email: "patient@example.com".to_string(),
            password_hash: "hash".to_string(),
            user_type: UserType::Patient,
            practice_id: None,
            full_name: Some("Pat Ient".to_string()),
            verification_token: None,
        })
        .await
        .unwrap();

    Fixture {
        store,
        practice,
        dentist,
        routine,
        urgent,
        patient,
    }
}

async fn slot(f: &Fixture, treatment: &Treatment, in_hours: i64) -> Appointment {
    f.store
        .insert_appointment(NewAppointment {
            practice_id: f.practice.id,
            dentist_id: f.dentist.id,
            treatment_id: treatment.id,
            appointment_date: Utc::now() + Duration::hours(in_hours),
        })
        .await
        .unwrap()
}

fn new_booking(f: &Fixture, appointment_id: Uuid) -> NewBooking {
    NewBooking {
        user_id: f.patient.id,
        appointment_id,
        patient: PatientDetails {
            full_name: "Pat Ient".to_string(),
            email: "patient@example.com".to_string(),
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn book_slot_flips_appointment_and_snapshots_fields() {
    let f = fixture().await;
    let appointment = slot(&f, &f.routine, 24).await;

    let booked = f.store.book_slot(new_booking(&f, appointment.id)).await.unwrap();

    assert_eq!(booked.appointment.status, AppointmentStatus::Booked);
    assert_eq!(booked.appointment.user_id, Some(f.patient.id));
    assert_eq!(booked.booking.appointment_date, appointment.appointment_date);
    assert_eq!(booked.booking.dentist_id, f.dentist.id);

    let stored = f.store.get_appointment(appointment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Booked);
}

#[tokio::test]
async fn book_slot_rejects_unknown_and_taken_slots() {
    let f = fixture().await;
    let appointment = slot(&f, &f.routine, 24).await;

    let missing = f.store.book_slot(new_booking(&f, Uuid::new_v4())).await;
    assert_matches!(missing, Err(StoreError::NotFound { entity: "appointment", .. }));

    f.store.book_slot(new_booking(&f, appointment.id)).await.unwrap();
    let second = f.store.book_slot(new_booking(&f, appointment.id)).await;
    assert_matches!(second, Err(StoreError::Conflict(_)));
}

#[tokio::test]
async fn concurrent_book_slot_has_exactly_one_winner() {
    let f = fixture().await;
    let appointment = slot(&f, &f.routine, 24).await;

    let attempts = (0..16).map(|_| {
        let store = Arc::clone(&f.store);
        let booking = new_booking(&f, appointment.id);
        tokio::spawn(async move { store.book_slot(booking).await })
    });

    let results = futures::future::join_all(attempts).await;
    let (ok, conflicts): (Vec<_>, Vec<_>) = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .partition(|r| r.is_ok());

    assert_eq!(ok.len(), 1);
    assert_eq!(conflicts.len(), 15);
    assert!(conflicts
        .iter()
        .all(|r| matches!(r, Err(StoreError::Conflict(_)))));

    let bookings = f.store.list_bookings_for_appointment(appointment.id).await.unwrap();
    assert_eq!(bookings.len(), 1);
}

#[tokio::test]
async fn transition_is_conditional_on_expected_state() {
    let f = fixture().await;
    let appointment = slot(&f, &f.routine, 24).await;
    let booked = f.store.book_slot(new_booking(&f, appointment.id)).await.unwrap();

    let approve = BookingTransition {
        booking_id: booked.booking.id,
        expected_status: BookingStatus::Confirmed,
        expected_approval: ApprovalStatus::Pending,
        status: BookingStatus::Confirmed,
        approval_status: ApprovalStatus::Approved,
        payment_status: None,
        cancelled_by: None,
        cancellation_reason: None,
        appointment: None,
    };

    let first = f.store.apply_transition(approve.clone()).await.unwrap();
    assert_eq!(first.booking.approval_status, ApprovalStatus::Approved);

    let replay = f.store.apply_transition(approve).await;
    assert_matches!(replay, Err(StoreError::Stale(_)));
}

#[tokio::test]
async fn failed_transition_leaves_both_rows_untouched() {
    let f = fixture().await;
    let appointment = slot(&f, &f.routine, 24).await;
    let booked = f.store.book_slot(new_booking(&f, appointment.id)).await.unwrap();

    let complete = BookingTransition {
        booking_id: booked.booking.id,
        expected_status: BookingStatus::Confirmed,
        expected_approval: ApprovalStatus::Pending,
        status: BookingStatus::Completed,
        approval_status: ApprovalStatus::Pending,
        payment_status: None,
        cancelled_by: None,
        cancellation_reason: None,
        appointment: Some(AppointmentChange {
            status: AppointmentStatus::Completed,
            release_user: false,
        }),
    };
    f.store.apply_transition(complete.clone()).await.unwrap();

    // Second attempt must fail on the booking check without touching the slot.
    assert_matches!(f.store.apply_transition(complete).await, Err(StoreError::Stale(_)));
    let stored = f.store.get_appointment(appointment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn cancelled_slot_release_allows_rebooking() {
    let f = fixture().await;
    let appointment = slot(&f, &f.routine, 24).await;
    let booked = f.store.book_slot(new_booking(&f, appointment.id)).await.unwrap();

    let released = f
        .store
        .apply_transition(BookingTransition {
            booking_id: booked.booking.id,
            expected_status: BookingStatus::Confirmed,
            expected_approval: ApprovalStatus::Pending,
            status: BookingStatus::Cancelled,
            approval_status: ApprovalStatus::Pending,
            payment_status: None,
            cancelled_by: Some(CancellationActor::Patient),
            cancellation_reason: Some("changed plans".to_string()),
            appointment: Some(AppointmentChange {
                status: AppointmentStatus::Available,
                release_user: true,
            }),
        })
        .await
        .unwrap();

    assert_eq!(released.appointment.status, AppointmentStatus::Available);
    assert_eq!(released.appointment.user_id, None);
    assert_eq!(released.booking.cancelled_by, Some(CancellationActor::Patient));

    let again = f.store.book_slot(new_booking(&f, appointment.id)).await;
    assert!(again.is_ok());
    assert_eq!(f.store.list_bookings_for_appointment(appointment.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn available_slots_filter_by_category_and_time() {
    let f = fixture().await;
    let past = slot(&f, &f.urgent, -2).await;
    let soon = slot(&f, &f.urgent, 3).await;
    let later = slot(&f, &f.urgent, 30).await;
    let routine = slot(&f, &f.routine, 5).await;

    let urgent = f
        .store
        .list_available_appointments(&SlotFilter {
            category: Some(TreatmentCategory::Urgent),
            after: Some(Utc::now()),
            ..Default::default()
        })
        .await
        .unwrap();

    let ids: Vec<Uuid> = urgent.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![soon.id, later.id]);
    assert!(!ids.contains(&past.id));
    assert!(!ids.contains(&routine.id));
}

#[tokio::test]
async fn unique_keys_are_enforced() {
    let f = fixture().await;

    let dup_email = f
        .store
        .insert_user(NewUser {
            email: "PATIENT@example.com".to_string(),
            password_hash: "hash".to_string(),
            user_type: UserType::Patient,
            practice_id: None,
            full_name: None,
            verification_token: None,
        })
        .await;
    assert_matches!(dup_email, Err(StoreError::Duplicate(_)));

    let dup_tag = f
        .store
        .insert_practice(NewPractice {
            name: "Other".to_string(),
            address: "2 Road".to_string(),
            postcode: "BS2 0AA".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            phone: "0".to_string(),
            email: "other@example.com".to_string(),
            practice_tag: f.practice.practice_tag.clone(),
            rating: 3.0,
            accessibility: AccessibilityFeatures::default(),
        })
        .await;
    assert_matches!(dup_tag, Err(StoreError::Duplicate(_)));
}

#[tokio::test]
async fn practice_search_matches_postcode_prefix_and_needs() {
    let f = fixture().await;

    let by_postcode = f
        .store
        .list_practices(&PracticeFilter {
            postcode_prefix: Some("bs1".to_string()),
            needs: vec![],
        })
        .await
        .unwrap();
    assert_eq!(by_postcode.len(), 1);

    let needs_sign_language = f
        .store
        .list_practices(&PracticeFilter {
            postcode_prefix: None,
            needs: vec![AccessibilityNeed::SignLanguage],
        })
        .await
        .unwrap();
    assert!(needs_sign_language.is_empty());
}
