use async_trait::async_trait;
use uuid::Uuid;

use shared_models::entities::{Booking, User};

use crate::error::ClientError;
use crate::models::{BookingSubmission, CreatedBooking, Credentials, LoginSession};

/// The slice of the booking API the patient-facing views depend on.
#[async_trait]
pub trait BookingGateway: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<LoginSession, ClientError>;

    async fn restore_session(&self, token: &str) -> Result<User, ClientError>;

    async fn logout(&self, token: &str) -> Result<(), ClientError>;

    async fn create_booking(
        &self,
        token: &str,
        submission: &BookingSubmission,
    ) -> Result<CreatedBooking, ClientError>;

    async fn list_bookings_for_user(&self, token: &str, user_id: Uuid) -> Result<Vec<Booking>, ClientError>;
}
