use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::entities::{Appointment, Booking, PatientDetails, User, UserType};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub user_type: UserType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginSession {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Body of `POST /api/bookings`.
#[derive(Debug, Clone, Serialize)]
pub struct BookingSubmission {
    pub appointment_id: Uuid,
    #[serde(flatten)]
    pub patient: PatientDetails,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedBooking {
    pub booking: Booking,
    pub appointment: Appointment,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
    pub code: Option<String>,
}
