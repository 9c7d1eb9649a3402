use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use patient_client::flow::SELECTION_STEP;
use patient_client::{
    BookingFlow, BookingGateway, BookingSubmission, ClientError, CreatedBooking, Credentials,
    DraftUpdate, LoginSession, SessionContext, StatusPoller,
};
use shared_models::entities::{
    AccessibilityNeed, Appointment, AppointmentStatus, ApprovalStatus, Booking, BookingStatus,
    PatientDetails, PaymentStatus, TreatmentCategory, User, UserType,
};

fn user(id: Uuid) -> User {
    User {
        id,
        email: "pat@example.com".to_string(),
        password_hash: String::new(),
        user_type: UserType::Patient,
        practice_id: None,
        full_name: Some("Pat Ient".to_string()),
        verified: true,
        verification_token: None,
        reset_token: None,
        reset_token_expires_at: None,
        created_at: Utc::now(),
    }
}

fn booking(id: Uuid, user_id: Uuid, approval: ApprovalStatus) -> Booking {
    let now = Utc::now();
    Booking {
        id,
        user_id,
        appointment_id: Uuid::new_v4(),
        practice_id: Uuid::new_v4(),
        dentist_id: Uuid::new_v4(),
        treatment_id: Uuid::new_v4(),
        appointment_date: now + Duration::days(2),
        status: BookingStatus::Confirmed,
        payment_status: PaymentStatus::Pending,
        approval_status: approval,
        patient: PatientDetails::default(),
        cancellation_reason: None,
        cancelled_by: None,
        created_at: now,
        updated_at: now,
    }
}

/// Scripted gateway: each `create_booking` pops the next outcome, each poll
/// pops the next approval status (repeating the last one).
#[derive(Default)]
struct FakeGateway {
    user_id: Uuid,
    booking_id: Uuid,
    create_outcomes: Mutex<VecDeque<Result<(), ClientError>>>,
    submissions: Mutex<Vec<BookingSubmission>>,
    approvals: Mutex<VecDeque<ApprovalStatus>>,
    polls: Mutex<usize>,
    logged_out: Mutex<bool>,
}

impl FakeGateway {
    fn new() -> Self {
        Self {
            user_id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            ..Default::default()
        }
    }
}

fn conflict() -> ClientError {
    ClientError::Api {
        status: 409,
        code: Some("CONFLICT".to_string()),
        message: "Conflict: appointment is no longer available".to_string(),
    }
}

#[async_trait]
impl BookingGateway for FakeGateway {
    async fn login(&self, credentials: &Credentials) -> Result<LoginSession, ClientError> {
        if credentials.password != "correct-horse" {
            return Err(ClientError::Api {
                status: 401,
                code: Some("UNAUTHORIZED".to_string()),
                message: "Invalid email, password or account type".to_string(),
            });
        }
        Ok(LoginSession {
            user: user(self.user_id),
            token: "jwt-token".to_string(),
            expires_at: Utc::now() + Duration::hours(24),
        })
    }

    async fn restore_session(&self, token: &str) -> Result<User, ClientError> {
        if *self.logged_out.lock().unwrap() || token != "jwt-token" {
            return Err(ClientError::Api {
                status: 401,
                code: Some("UNAUTHORIZED".to_string()),
                message: "Session not found".to_string(),
            });
        }
        Ok(user(self.user_id))
    }

    async fn logout(&self, _token: &str) -> Result<(), ClientError> {
        *self.logged_out.lock().unwrap() = true;
        Ok(())
    }

    async fn create_booking(
        &self,
        _token: &str,
        submission: &BookingSubmission,
    ) -> Result<CreatedBooking, ClientError> {
        self.submissions.lock().unwrap().push(submission.clone());
        let outcome = self.create_outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()));
        outcome?;

        let booking = booking(self.booking_id, self.user_id, ApprovalStatus::Pending);
        let appointment = Appointment {
            id: submission.appointment_id,
            practice_id: booking.practice_id,
            dentist_id: booking.dentist_id,
            treatment_id: booking.treatment_id,
            user_id: Some(self.user_id),
            appointment_date: booking.appointment_date,
            status: AppointmentStatus::Booked,
            created_at: booking.created_at,
            updated_at: booking.created_at,
        };
        Ok(CreatedBooking { booking, appointment })
    }

    async fn list_bookings_for_user(&self, _token: &str, user_id: Uuid) -> Result<Vec<Booking>, ClientError> {
        *self.polls.lock().unwrap() += 1;
        let mut approvals = self.approvals.lock().unwrap();
        let approval = if approvals.len() > 1 {
            approvals.pop_front()
        } else {
            approvals.front().copied()
        };
        Ok(approval
            .map(|a| vec![booking(self.booking_id, user_id, a)])
            .unwrap_or_default())
    }
}

async fn signed_in(gateway: &FakeGateway) -> SessionContext {
    let session = SessionContext::in_memory();
    session
        .login(
            gateway,
            &Credentials {
                email: "pat@example.com".to_string(),
                password: "correct-horse".to_string(),
                user_type: UserType::Patient,
            },
        )
        .await
        .unwrap();
    session
}

fn filled_flow(appointment_id: Uuid) -> BookingFlow {
    let mut flow = BookingFlow::new();
    flow.update(DraftUpdate {
        category: Some(TreatmentCategory::Routine),
        ..Default::default()
    });
    flow.advance();
    flow.update(DraftUpdate {
        accessibility_needs: Some(vec![AccessibilityNeed::Wheelchair]),
        ..Default::default()
    });
    flow.advance();
    flow.update(DraftUpdate {
        practice_id: Some(Uuid::new_v4()),
        dentist_id: Some(Uuid::new_v4()),
        appointment_id: Some(appointment_id),
        ..Default::default()
    });
    flow.advance();
    flow.update(DraftUpdate {
        patient: Some(PatientDetails {
            full_name: "Pat Ient".to_string(),
            email: "pat@example.com".to_string(),
            anxiety_level: Some(2),
            ..Default::default()
        }),
        ..Default::default()
    });
    flow
}

#[tokio::test]
async fn session_context_tracks_login_and_logout() {
    let gateway = FakeGateway::new();
    let session = signed_in(&gateway).await;

    assert!(session.is_signed_in());
    assert_eq!(session.current_user_id(), Some(gateway.user_id));
    assert_eq!(session.current_user().map(|u| u.email), Some("pat@example.com".to_string()));

    let restored = session.restore(&gateway).await.unwrap();
    assert_eq!(restored.id, gateway.user_id);

    session.logout(&gateway).await.unwrap();
    assert!(!session.is_signed_in());
    assert!(session.current_user().is_none());
    assert_matches!(session.restore(&gateway).await, Err(ClientError::NotAuthenticated));
}

#[tokio::test]
async fn rejected_login_leaves_session_empty() {
    let gateway = FakeGateway::new();
    let session = SessionContext::in_memory();

    let result = session
        .login(
            &gateway,
            &Credentials {
                email: "pat@example.com".to_string(),
                password: "wrong".to_string(),
                user_type: UserType::Patient,
            },
        )
        .await;

    assert!(result.unwrap_err().is_unauthorized());
    assert!(!session.is_signed_in());
}

#[tokio::test]
async fn successful_submit_resets_flow() {
    let gateway = FakeGateway::new();
    let session = signed_in(&gateway).await;
    let appointment_id = Uuid::new_v4();
    let mut flow = filled_flow(appointment_id);

    let created = flow.submit(&gateway, &session).await.unwrap();

    assert_eq!(created.appointment.id, appointment_id);
    assert_eq!(flow.step(), 1);
    assert!(flow.draft().appointment_id.is_none());

    let submissions = gateway.submissions.lock().unwrap();
    assert_eq!(submissions[0].patient.accessibility_needs, vec![AccessibilityNeed::Wheelchair]);
}

#[tokio::test]
async fn conflict_returns_to_selection_keeping_draft() {
    let gateway = FakeGateway::new();
    gateway.create_outcomes.lock().unwrap().push_back(Err(conflict()));
    let session = signed_in(&gateway).await;
    let mut flow = filled_flow(Uuid::new_v4());
    let practice_id = flow.draft().practice_id;

    let err = flow.submit(&gateway, &session).await.unwrap_err();

    assert!(err.is_slot_conflict());
    assert_eq!(flow.step(), SELECTION_STEP);
    assert!(flow.draft().appointment_id.is_none());
    assert_eq!(flow.draft().practice_id, practice_id);
    assert_eq!(flow.draft().category, Some(TreatmentCategory::Routine));
    assert_eq!(flow.draft().patient.full_name, "Pat Ient");

    // Pick another slot and try again.
    let replacement = Uuid::new_v4();
    flow.update(DraftUpdate {
        appointment_id: Some(replacement),
        ..Default::default()
    });
    let created = flow.submit(&gateway, &session).await.unwrap();
    assert_eq!(created.appointment.id, replacement);
}

#[tokio::test]
async fn other_failures_leave_flow_untouched() {
    let gateway = FakeGateway::new();
    gateway.create_outcomes.lock().unwrap().push_back(Err(ClientError::Api {
        status: 400,
        code: Some("VALIDATION_ERROR".to_string()),
        message: "Anxiety level must be between 1 and 5".to_string(),
    }));
    let session = signed_in(&gateway).await;
    let mut flow = filled_flow(Uuid::new_v4());
    let before = flow.draft().clone();
    let step = flow.step();

    flow.submit(&gateway, &session).await.unwrap_err();

    assert_eq!(flow.step(), step);
    assert_eq!(flow.draft(), &before);
}

#[tokio::test]
async fn submit_requires_sign_in() {
    let gateway = FakeGateway::new();
    let session = SessionContext::in_memory();
    let mut flow = filled_flow(Uuid::new_v4());

    assert_matches!(flow.submit(&gateway, &session).await, Err(ClientError::NotAuthenticated));
    assert!(gateway.submissions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn poller_reports_each_change_once() {
    let gateway = Arc::new(FakeGateway::new());
    gateway.approvals.lock().unwrap().extend([
        ApprovalStatus::Pending,
        ApprovalStatus::Pending,
        ApprovalStatus::Approved,
    ]);

    let mut handle = StatusPoller::new(gateway.clone(), "jwt-token".to_string(), gateway.user_id)
        .with_interval(StdDuration::from_millis(10))
        .spawn();

    let change = tokio::time::timeout(StdDuration::from_secs(2), handle.next_change())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(change.booking_id, gateway.booking_id);
    assert_eq!(change.previous, ApprovalStatus::Pending);
    assert_eq!(change.current, ApprovalStatus::Approved);

    // The status stays approved, so nothing else is reported.
    let again = tokio::time::timeout(StdDuration::from_millis(100), handle.next_change()).await;
    assert!(again.is_err());
}

#[tokio::test]
async fn cancelled_poller_stops_polling() {
    let gateway = Arc::new(FakeGateway::new());
    gateway.approvals.lock().unwrap().push_back(ApprovalStatus::Pending);

    let handle = StatusPoller::new(gateway.clone(), "jwt-token".to_string(), gateway.user_id)
        .with_interval(StdDuration::from_millis(10))
        .spawn();
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    handle.cancel();
    tokio::time::sleep(StdDuration::from_millis(30)).await;
    assert!(handle.is_finished());

    let polls = *gateway.polls.lock().unwrap();
    tokio::time::sleep(StdDuration::from_millis(50)).await;
    assert_eq!(*gateway.polls.lock().unwrap(), polls);
}
