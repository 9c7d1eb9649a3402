use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::entities::{
    AccessibilityNeed, Appointment, AppointmentStatus, ApprovalStatus, Booking, BookingStatus,
    CancellationActor, Dentist, NewAppointment, NewBooking, NewDentist, NewPractice, NewSession,
    NewTreatment, NewUser, PaymentStatus, Practice, Session, Treatment, TreatmentCategory, User,
};

use crate::supabase::DatabaseError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The appointment slot is no longer bookable.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A conditional update found a different state than the caller expected.
    #[error("Stale state: {0}")]
    Stale(String),

    #[error("Duplicate value for unique key {0}")]
    Duplicate(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default)]
pub struct PracticeFilter {
    /// Case-insensitive prefix match on the practice postcode.
    pub postcode_prefix: Option<String>,
    pub needs: Vec<AccessibilityNeed>,
}

#[derive(Debug, Clone, Default)]
pub struct SlotFilter {
    pub practice_id: Option<Uuid>,
    pub category: Option<TreatmentCategory>,
    /// Only slots strictly after this instant.
    pub after: Option<DateTime<Utc>>,
}

/// Appointment side of a booking transition. The appointment must currently be
/// `booked` for the transition to commit.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentChange {
    pub status: AppointmentStatus,
    /// Clear `user_id` so the slot can be booked again.
    pub release_user: bool,
}

/// Conditional update of a booking and its appointment. Commits all-or-nothing,
/// and only when the booking still has `expected_status`/`expected_approval`.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingTransition {
    pub booking_id: Uuid,
    pub expected_status: BookingStatus,
    pub expected_approval: ApprovalStatus,
    pub status: BookingStatus,
    pub approval_status: ApprovalStatus,
    pub payment_status: Option<PaymentStatus>,
    pub cancelled_by: Option<CancellationActor>,
    pub cancellation_reason: Option<String>,
    pub appointment: Option<AppointmentChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedSlot {
    pub booking: Booking,
    pub appointment: Appointment,
}

/// Persistence boundary for every entity in the schema.
#[async_trait]
pub trait BookingStore: Send + Sync {
    // users
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_verification_token(&self, token: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>>;
    async fn update_user(&self, user: &User) -> StoreResult<User>;

    // sessions
    async fn insert_session(&self, session: NewSession) -> StoreResult<Session>;
    async fn get_session(&self, id: &str) -> StoreResult<Option<Session>>;
    async fn delete_session(&self, id: &str) -> StoreResult<bool>;

    // practice directory
    async fn insert_practice(&self, practice: NewPractice) -> StoreResult<Practice>;
    async fn get_practice(&self, id: Uuid) -> StoreResult<Option<Practice>>;
    async fn find_practice_by_tag(&self, tag: &str) -> StoreResult<Option<Practice>>;
    async fn list_practices(&self, filter: &PracticeFilter) -> StoreResult<Vec<Practice>>;

    async fn insert_treatment(&self, treatment: NewTreatment) -> StoreResult<Treatment>;
    async fn get_treatment(&self, id: Uuid) -> StoreResult<Option<Treatment>>;
    async fn list_treatments(&self, category: Option<TreatmentCategory>) -> StoreResult<Vec<Treatment>>;

    async fn insert_dentist(&self, dentist: NewDentist) -> StoreResult<Dentist>;
    async fn get_dentist(&self, id: Uuid) -> StoreResult<Option<Dentist>>;
    async fn list_dentists(&self, practice_id: Uuid) -> StoreResult<Vec<Dentist>>;

    // slots
    async fn insert_appointment(&self, appointment: NewAppointment) -> StoreResult<Appointment>;
    async fn get_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>>;
    async fn list_available_appointments(&self, filter: &SlotFilter) -> StoreResult<Vec<Appointment>>;

    // bookings
    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;
    async fn list_bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Booking>>;
    async fn list_bookings_for_practice(&self, practice_id: Uuid) -> StoreResult<Vec<Booking>>;
    async fn list_bookings_for_appointment(&self, appointment_id: Uuid) -> StoreResult<Vec<Booking>>;

    /// Atomically flip the appointment `available -> booked`, attach the patient
    /// and insert the booking. `Conflict` if the slot is not available.
    async fn book_slot(&self, booking: NewBooking) -> StoreResult<BookedSlot>;

    /// Atomically apply `transition`. `Stale` if the booking or its appointment
    /// moved since the caller read it.
    async fn apply_transition(&self, transition: BookingTransition) -> StoreResult<BookedSlot>;
}
