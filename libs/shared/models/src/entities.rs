// libs/shared/models/src/entities.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// STATUS ENUMS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Patient,
    Dentist,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Patient => "patient",
            UserType::Dentist => "dentist",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "patient" => Some(UserType::Patient),
            "dentist" => Some(UserType::Dentist),
            _ => None,
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentCategory {
    Emergency,
    Urgent,
    Routine,
    Cosmetic,
}

impl TreatmentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreatmentCategory::Emergency => "emergency",
            TreatmentCategory::Urgent => "urgent",
            TreatmentCategory::Routine => "routine",
            TreatmentCategory::Cosmetic => "cosmetic",
        }
    }
}

impl fmt::Display for TreatmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Available,
    Booked,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Available => "available",
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

/// Practice-side decision on a placed booking. Orthogonal to `BookingStatus`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CancellationActor {
    Patient,
    Practice,
}

impl fmt::Display for CancellationActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancellationActor::Patient => f.write_str("patient"),
            CancellationActor::Practice => f.write_str("practice"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AccessibilityNeed {
    Wheelchair,
    SignLanguage,
    VisualImpairment,
    Cognitive,
    Parking,
}

// ==============================================================================
// ENTITIES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    pub user_type: UserType,
    pub practice_id: Option<Uuid>,
    pub full_name: Option<String>,
    pub verified: bool,
    #[serde(default, skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(default, skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(default, skip_serializing)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AccessibilityFeatures {
    pub wheelchair_access: bool,
    pub sign_language: bool,
    pub visual_impairment_support: bool,
    pub cognitive_support: bool,
    pub parking: bool,
}

impl AccessibilityFeatures {
    pub fn supports(&self, need: AccessibilityNeed) -> bool {
        match need {
            AccessibilityNeed::Wheelchair => self.wheelchair_access,
            AccessibilityNeed::SignLanguage => self.sign_language,
            AccessibilityNeed::VisualImpairment => self.visual_impairment_support,
            AccessibilityNeed::Cognitive => self.cognitive_support,
            AccessibilityNeed::Parking => self.parking,
        }
    }

    pub fn supports_all(&self, needs: &[AccessibilityNeed]) -> bool {
        needs.iter().all(|need| self.supports(*need))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Practice {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub postcode: String,
    pub latitude: f64,
    pub longitude: f64,
    pub phone: String,
    pub email: String,
    /// Access PIN. Never leaves the server.
    #[serde(default, skip_serializing)]
    pub practice_tag: String,
    pub rating: f32,
    #[serde(flatten)]
    pub accessibility: AccessibilityFeatures,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub id: Uuid,
    pub name: String,
    pub category: TreatmentCategory,
    pub duration_minutes: i32,
    pub price_pence: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dentist {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub title: String,
    pub full_name: String,
    pub specialization: String,
    pub experience_years: i32,
    pub languages: Vec<String>,
    pub available_days: Vec<i32>, // 0 = Sunday, 1 = Monday, etc.
    pub created_at: DateTime<Utc>,
}

impl Dentist {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.title, self.full_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub dentist_id: Uuid,
    pub user_id: Option<Uuid>,
    pub treatment_id: Uuid,
    pub appointment_date: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contact and medical information captured by the booking flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientDetails {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub medical_conditions: Option<String>,
    pub medications: Option<String>,
    pub allergies: Option<String>,
    pub anxiety_level: Option<u8>,
    #[serde(default)]
    pub accessibility_needs: Vec<AccessibilityNeed>,
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub appointment_id: Uuid,
    // Snapshot of the appointment at creation time.
    pub practice_id: Uuid,
    pub dentist_id: Uuid,
    pub treatment_id: Uuid,
    pub appointment_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub approval_status: ApprovalStatus,
    #[serde(flatten)]
    pub patient: PatientDetails,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<CancellationActor>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// ==============================================================================
// INSERT SCHEMAS (no client-supplied id / created_at)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub practice_id: Option<Uuid>,
    pub full_name: Option<String>,
    pub verification_token: Option<String>,
}

impl NewUser {
    pub fn into_record(self, id: Uuid, now: DateTime<Utc>) -> User {
        User {
            id,
            email: self.email,
            password_hash: self.password_hash,
            user_type: self.user_type,
            practice_id: self.practice_id,
            full_name: self.full_name,
            verified: false,
            verification_token: self.verification_token,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPractice {
    pub name: String,
    pub address: String,
    pub postcode: String,
    pub latitude: f64,
    pub longitude: f64,
    pub phone: String,
    pub email: String,
    pub practice_tag: String,
    pub rating: f32,
    #[serde(flatten)]
    pub accessibility: AccessibilityFeatures,
}

impl NewPractice {
    pub fn into_record(self, id: Uuid, now: DateTime<Utc>) -> Practice {
        Practice {
            id,
            name: self.name,
            address: self.address,
            postcode: self.postcode,
            latitude: self.latitude,
            longitude: self.longitude,
            phone: self.phone,
            email: self.email,
            practice_tag: self.practice_tag,
            rating: self.rating,
            accessibility: self.accessibility,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTreatment {
    pub name: String,
    pub category: TreatmentCategory,
    pub duration_minutes: i32,
    pub price_pence: i64,
}

impl NewTreatment {
    pub fn into_record(self, id: Uuid, now: DateTime<Utc>) -> Treatment {
        Treatment {
            id,
            name: self.name,
            category: self.category,
            duration_minutes: self.duration_minutes,
            price_pence: self.price_pence,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDentist {
    pub practice_id: Uuid,
    pub title: String,
    pub full_name: String,
    pub specialization: String,
    pub experience_years: i32,
    pub languages: Vec<String>,
    pub available_days: Vec<i32>,
}

impl NewDentist {
    pub fn into_record(self, id: Uuid, now: DateTime<Utc>) -> Dentist {
        Dentist {
            id,
            practice_id: self.practice_id,
            title: self.title,
            full_name: self.full_name,
            specialization: self.specialization,
            experience_years: self.experience_years,
            languages: self.languages,
            available_days: self.available_days,
            created_at: now,
        }
    }
}

/// A bookable slot published by a practice. Always starts `available`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub practice_id: Uuid,
    pub dentist_id: Uuid,
    pub treatment_id: Uuid,
    pub appointment_date: DateTime<Utc>,
}

impl NewAppointment {
    pub fn into_record(self, id: Uuid, now: DateTime<Utc>) -> Appointment {
        Appointment {
            id,
            practice_id: self.practice_id,
            dentist_id: self.dentist_id,
            user_id: None,
            treatment_id: self.treatment_id,
            appointment_date: self.appointment_date,
            status: AppointmentStatus::Available,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Booking insert. The snapshot fields are filled from the appointment by the
/// store inside the same transaction that flips the slot to `booked`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub user_id: Uuid,
    pub appointment_id: Uuid,
    #[serde(flatten)]
    pub patient: PatientDetails,
}

impl NewBooking {
    pub fn into_record(self, id: Uuid, appointment: &Appointment, now: DateTime<Utc>) -> Booking {
        Booking {
            id,
            user_id: self.user_id,
            appointment_id: appointment.id,
            practice_id: appointment.practice_id,
            dentist_id: appointment.dentist_id,
            treatment_id: appointment.treatment_id,
            appointment_date: appointment.appointment_date,
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Pending,
            approval_status: ApprovalStatus::Pending,
            patient: self.patient,
            cancellation_reason: None,
            cancelled_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl NewSession {
    pub fn into_record(self, now: DateTime<Utc>) -> Session {
        Session {
            id: self.id,
            user_id: self.user_id,
            expires_at: self.expires_at,
            created_at: now,
        }
    }
}
