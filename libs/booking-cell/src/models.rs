// libs/booking-cell/src/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::entities::{ApprovalStatus, PatientDetails};
use shared_models::error::AppError;

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    #[serde(alias = "appointmentId")]
    pub appointment_id: Uuid,
    #[serde(flatten)]
    pub patient: PatientDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub status: ApprovalStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelBookingRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => BookingError::NotFound(format!("{} {}", entity, id)),
            StoreError::Conflict(msg) => BookingError::Conflict(msg),
            StoreError::Stale(msg) => BookingError::Conflict(msg),
            StoreError::Duplicate(key) => BookingError::Conflict(format!("duplicate {}", key)),
            StoreError::Backend(msg) => BookingError::Store(msg),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            BookingError::Conflict(msg) => AppError::Conflict(msg),
            BookingError::InvalidState(msg) => AppError::InvalidState(msg),
            BookingError::InvalidTransition(msg) => AppError::InvalidTransition(msg),
            BookingError::Validation(msg) => AppError::ValidationError(msg),
            BookingError::Forbidden(msg) => AppError::Forbidden(msg),
            BookingError::Store(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_accepts_flat_patient_fields() {
        let request: CreateBookingRequest = serde_json::from_value(json!({
            "appointmentId": "6f1c1d0e-6f53-4d55-9d4e-3f8f0f0b2a11",
            "full_name": "Pat Ient",
            "email": "pat@example.com",
            "anxiety_level": 3,
            "accessibility_needs": ["wheelchair"]
        }))
        .unwrap();

        assert_eq!(request.patient.full_name, "Pat Ient");
        assert_eq!(request.patient.anxiety_level, Some(3));
        assert_eq!(request.patient.accessibility_needs.len(), 1);
    }

    #[test]
    fn errors_keep_their_codes() {
        assert_eq!(AppError::from(BookingError::Conflict("x".into())).code(), "CONFLICT");
        assert_eq!(AppError::from(BookingError::InvalidState("x".into())).code(), "INVALID_STATE");
        assert_eq!(
            AppError::from(BookingError::InvalidTransition("x".into())).code(),
            "INVALID_TRANSITION"
        );
        assert_eq!(
            AppError::from(BookingError::from(StoreError::not_found("booking", "1"))).code(),
            "NOT_FOUND"
        );
    }
}
