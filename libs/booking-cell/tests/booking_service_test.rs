use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use booking_cell::{BookingError, BookingService, CreateBookingRequest};
use notification_cell::{MailMessage, MailTransport, NotificationDispatcher, TransportError};
use shared_database::{BookingStore, InMemoryStore};
use shared_models::auth::AuthUser;
use shared_models::entities::{
    AppointmentStatus, ApprovalStatus, BookingStatus, CancellationActor, NewBooking,
    TreatmentCategory,
};
use shared_utils::test_utils::{
    patient_details, seed_patient, seed_practice, PracticeFixture, TestConfig, TestUser,
};

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<MailMessage>>,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct Harness {
    store: Arc<InMemoryStore>,
    service: Arc<BookingService>,
    fixture: PracticeFixture,
    patient: AuthUser,
    dentist: AuthUser,
}

async fn harness_with(dispatcher: NotificationDispatcher) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let fixture = seed_practice(store.as_ref(), "PIN-4821").await.unwrap();
    let patient_user = seed_patient(store.as_ref(), "patient@example.com").await.unwrap();

    let service = Arc::new(BookingService::new(store.clone(), Arc::new(dispatcher)));

    Harness {
        patient: TestUser::from_user(&patient_user).to_auth_user(),
        dentist: TestUser::from_user(&fixture.staff).to_auth_user(),
        store,
        service,
        fixture,
    }
}

async fn harness() -> Harness {
    harness_with(NotificationDispatcher::disabled(&TestConfig::default().to_app_config())).await
}

impl Harness {
    async fn future_slot(&self) -> Uuid {
        self.fixture
            .slot(self.store.as_ref(), TreatmentCategory::Routine, Utc::now() + Duration::days(2))
            .await
            .unwrap()
            .id
    }

    fn request(&self, appointment_id: Uuid) -> CreateBookingRequest {
        CreateBookingRequest {
            appointment_id,
            patient: patient_details("patient@example.com"),
        }
    }
}

async fn wait_for_mail(transport: &RecordingTransport, count: usize) -> Vec<MailMessage> {
    for _ in 0..100 {
        {
            let sent = transport.sent.lock().unwrap();
            if sent.len() >= count {
                return sent.clone();
            }
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    transport.sent.lock().unwrap().clone()
}

#[tokio::test]
async fn create_approve_complete_leaves_both_completed() {
    let h = harness().await;
    let slot = h.future_slot().await;

    let booked = h.service.create_booking(&h.patient, h.request(slot)).await.unwrap();
    assert_eq!(booked.appointment.status, AppointmentStatus::Booked);
    assert_eq!(booked.booking.status, BookingStatus::Confirmed);
    assert_eq!(booked.booking.approval_status, ApprovalStatus::Pending);

    let approved = h
        .service
        .set_approval_status(&h.dentist, booked.booking.id, ApprovalStatus::Approved)
        .await
        .unwrap();
    assert_eq!(approved.booking.approval_status, ApprovalStatus::Approved);

    let completed = h.service.complete_booking(&h.dentist, booked.booking.id).await.unwrap();
    assert_eq!(completed.booking.status, BookingStatus::Completed);
    assert_eq!(completed.appointment.status, AppointmentStatus::Completed);
    assert_eq!(completed.booking.approval_status, ApprovalStatus::Approved);
}

#[tokio::test]
async fn concurrent_bookings_on_one_slot_have_one_winner() {
    let h = harness().await;
    let slot = h.future_slot().await;

    let attempts = (0..8).map(|_| {
        let service = Arc::clone(&h.service);
        let patient = h.patient.clone();
        let request = h.request(slot);
        tokio::spawn(async move { service.create_booking(&patient, request).await })
    });
    let results: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(BookingError::Conflict(_)))));

    let active: Vec<_> = h
        .store
        .list_bookings_for_appointment(slot)
        .await
        .unwrap()
        .into_iter()
        .filter(|b| b.status != BookingStatus::Cancelled)
        .collect();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn unknown_or_taken_slots_are_rejected() {
    let h = harness().await;

    assert_matches!(
        h.service.create_booking(&h.patient, h.request(Uuid::new_v4())).await,
        Err(BookingError::NotFound(_))
    );

    let slot = h.future_slot().await;
    h.service.create_booking(&h.patient, h.request(slot)).await.unwrap();
    assert_matches!(
        h.service.create_booking(&h.patient, h.request(slot)).await,
        Err(BookingError::Conflict(_))
    );
}

#[tokio::test]
async fn invalid_requests_fail_validation() {
    let h = harness().await;
    let slot = h.future_slot().await;

    let mut request = h.request(slot);
    request.patient.anxiety_level = Some(7);
    assert_matches!(
        h.service.create_booking(&h.patient, request).await,
        Err(BookingError::Validation(_))
    );

    let mut request = h.request(slot);
    request.patient.email = "not-an-email".to_string();
    assert_matches!(
        h.service.create_booking(&h.patient, request).await,
        Err(BookingError::Validation(_))
    );

    let past = h
        .fixture
        .slot(h.store.as_ref(), TreatmentCategory::Routine, Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    assert_matches!(
        h.service.create_booking(&h.patient, h.request(past.id)).await,
        Err(BookingError::Validation(_))
    );

    assert_matches!(
        h.service.create_booking(&h.dentist, h.request(slot)).await,
        Err(BookingError::Forbidden(_))
    );
}

#[tokio::test]
async fn second_approval_is_an_invalid_transition() {
    let h = harness().await;
    let slot = h.future_slot().await;
    let booked = h.service.create_booking(&h.patient, h.request(slot)).await.unwrap();

    h.service
        .set_approval_status(&h.dentist, booked.booking.id, ApprovalStatus::Rejected)
        .await
        .unwrap();

    assert_matches!(
        h.service
            .set_approval_status(&h.dentist, booked.booking.id, ApprovalStatus::Approved)
            .await,
        Err(BookingError::InvalidTransition(_))
    );
}

#[tokio::test]
async fn completion_requires_approval() {
    let h = harness().await;
    let slot = h.future_slot().await;
    let booked = h.service.create_booking(&h.patient, h.request(slot)).await.unwrap();

    assert_matches!(
        h.service.complete_booking(&h.dentist, booked.booking.id).await,
        Err(BookingError::InvalidTransition(_))
    );

    h.service.cancel_booking(&h.patient, booked.booking.id, None).await.unwrap();
    assert_matches!(
        h.service.complete_booking(&h.dentist, booked.booking.id).await,
        Err(BookingError::InvalidState(_))
    );
}

#[tokio::test]
async fn cancelling_a_future_booking_releases_the_slot() {
    let h = harness().await;
    let slot = h.future_slot().await;
    let booked = h.service.create_booking(&h.patient, h.request(slot)).await.unwrap();

    let cancelled = h
        .service
        .cancel_booking(&h.patient, booked.booking.id, Some("Can't make it".to_string()))
        .await
        .unwrap();

    assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
    assert_eq!(cancelled.booking.cancelled_by, Some(CancellationActor::Patient));
    assert_eq!(cancelled.appointment.status, AppointmentStatus::Available);
    assert_eq!(cancelled.appointment.user_id, None);

    // The released slot is bookable again.
    assert!(h.service.create_booking(&h.patient, h.request(slot)).await.is_ok());

    assert_matches!(
        h.service.cancel_booking(&h.patient, booked.booking.id, None).await,
        Err(BookingError::InvalidState(_))
    );
}

#[tokio::test]
async fn cancelling_a_past_booking_closes_the_slot() {
    let h = harness().await;
    let past = h
        .fixture
        .slot(h.store.as_ref(), TreatmentCategory::Routine, Utc::now() - Duration::hours(3))
        .await
        .unwrap();
    let booked = h
        .store
        .book_slot(NewBooking {
            user_id: h.patient.id,
            appointment_id: past.id,
            patient: patient_details("patient@example.com"),
        })
        .await
        .unwrap();

    let cancelled = h
        .service
        .cancel_booking(&h.dentist, booked.booking.id, None)
        .await
        .unwrap();

    assert_eq!(cancelled.appointment.status, AppointmentStatus::Cancelled);
    assert_eq!(cancelled.booking.cancelled_by, Some(CancellationActor::Practice));
}

#[tokio::test]
async fn strangers_cannot_touch_a_booking() {
    let h = harness().await;
    let slot = h.future_slot().await;
    let booked = h.service.create_booking(&h.patient, h.request(slot)).await.unwrap();

    let stranger = TestUser::patient("someone@example.com").to_auth_user();
    assert_matches!(
        h.service.cancel_booking(&stranger, booked.booking.id, None).await,
        Err(BookingError::Forbidden(_))
    );
    assert_matches!(
        h.service.get_booking(&stranger, booked.booking.id).await,
        Err(BookingError::Forbidden(_))
    );
    assert_matches!(
        h.service
            .set_approval_status(&h.patient, booked.booking.id, ApprovalStatus::Approved)
            .await,
        Err(BookingError::Forbidden(_))
    );
    assert_matches!(
        h.service.list_bookings_for_user(&stranger, h.patient.id).await,
        Err(BookingError::Forbidden(_))
    );
}

#[tokio::test]
async fn racing_approval_and_cancel_stay_consistent() {
    let h = harness().await;
    let slot = h.future_slot().await;
    let booked = h.service.create_booking(&h.patient, h.request(slot)).await.unwrap();
    let id = booked.booking.id;

    let approve = {
        let service = Arc::clone(&h.service);
        let dentist = h.dentist.clone();
        tokio::spawn(async move { service.set_approval_status(&dentist, id, ApprovalStatus::Approved).await })
    };
    let cancel = {
        let service = Arc::clone(&h.service);
        let patient = h.patient.clone();
        tokio::spawn(async move { service.cancel_booking(&patient, id, None).await })
    };

    let approve = approve.await.unwrap();
    cancel.await.unwrap().unwrap();

    if let Err(e) = approve {
        assert_matches!(e, BookingError::InvalidState(_));
    }

    let booking = h.store.get_booking(id).await.unwrap().unwrap();
    let appointment = h.store.get_appointment(slot).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(appointment.status, AppointmentStatus::Available);
}

#[tokio::test]
async fn bookings_for_user_are_newest_first() {
    let h = harness().await;
    let first = h.future_slot().await;
    let second = h.future_slot().await;

    let older = h.service.create_booking(&h.patient, h.request(first)).await.unwrap();
    tokio::time::sleep(StdDuration::from_millis(5)).await;
    let newer = h.service.create_booking(&h.patient, h.request(second)).await.unwrap();

    let listed = h.service.list_bookings_for_user(&h.patient, h.patient.id).await.unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![newer.booking.id, older.booking.id]);

    let for_practice = h
        .service
        .list_bookings_for_practice(&h.dentist, h.fixture.practice.id)
        .await
        .unwrap();
    assert_eq!(for_practice.len(), 2);
}

#[tokio::test]
async fn booking_succeeds_while_notifications_are_suppressed() {
    let h = harness().await;
    let slot = h.future_slot().await;

    let booked = h.service.create_booking(&h.patient, h.request(slot)).await;
    assert!(booked.is_ok());
}

#[tokio::test]
async fn creation_notifies_practice_and_patient() {
    let transport = Arc::new(RecordingTransport::default());
    let config = TestConfig::default().to_app_config();
    let h = harness_with(NotificationDispatcher::with_transport(transport.clone(), &config)).await;
    let slot = h.future_slot().await;

    let booked = h.service.create_booking(&h.patient, h.request(slot)).await.unwrap();

    let sent = wait_for_mail(&transport, 2).await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, vec![h.fixture.practice.email.clone()]);
    assert_eq!(sent[1].to, vec!["patient@example.com".to_string()]);
    assert!(sent[0].html.contains(&booked.booking.id.to_string()));

    h.service
        .set_approval_status(&h.dentist, booked.booking.id, ApprovalStatus::Approved)
        .await
        .unwrap();
    let sent = wait_for_mail(&transport, 3).await;
    assert_eq!(sent.len(), 3);
    assert!(sent[2].subject.contains("approved"));
}
