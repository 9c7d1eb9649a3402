// libs/practice-cell/src/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::{PracticeFilter, StoreError};
use shared_models::entities::{AccessibilityNeed, Appointment, Dentist, Practice, TreatmentCategory};
use shared_models::error::AppError;

// ==============================================================================
// QUERY / REQUEST MODELS
// ==============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct TreatmentQuery {
    pub category: Option<TreatmentCategory>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSearchQuery {
    pub postcode: Option<String>,
    pub wheelchair: Option<bool>,
    pub sign_language: Option<bool>,
    pub visual_impairment: Option<bool>,
    pub cognitive: Option<bool>,
    pub parking: Option<bool>,
}

impl PracticeSearchQuery {
    pub fn needs(&self) -> Vec<AccessibilityNeed> {
        [
            (self.wheelchair, AccessibilityNeed::Wheelchair),
            (self.sign_language, AccessibilityNeed::SignLanguage),
            (self.visual_impairment, AccessibilityNeed::VisualImpairment),
            (self.cognitive, AccessibilityNeed::Cognitive),
            (self.parking, AccessibilityNeed::Parking),
        ]
        .into_iter()
        .filter(|(flag, _)| flag.unwrap_or(false))
        .map(|(_, need)| need)
        .collect()
    }

    pub fn to_filter(&self) -> PracticeFilter {
        PracticeFilter {
            postcode_prefix: self
                .postcode
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            needs: self.needs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeAccessRequest {
    pub practice_tag: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlotsQuery {
    pub category: Option<TreatmentCategory>,
    pub practice_id: Option<Uuid>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    pub radius_km: Option<f64>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PracticeAccess {
    pub practice: Practice,
    pub dentists: Vec<Dentist>,
    pub available_slots: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableSlot {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub practice_name: String,
    pub distance_km: Option<f64>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum PracticeError {
    #[error("Practice not found")]
    PracticeNotFound,

    #[error("Invalid practice tag")]
    UnknownTag,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<PracticeError> for AppError {
    fn from(err: PracticeError) -> Self {
        match err {
            PracticeError::PracticeNotFound => AppError::NotFound("Practice not found".to_string()),
            PracticeError::UnknownTag => AppError::NotFound("No practice matches that tag".to_string()),
            PracticeError::Validation(msg) => AppError::ValidationError(msg),
            PracticeError::Store(StoreError::NotFound { entity, id }) => {
                AppError::NotFound(format!("{} {}", entity, id))
            }
            PracticeError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
