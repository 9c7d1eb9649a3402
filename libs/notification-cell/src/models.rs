use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::entities::{ApprovalStatus, CancellationActor};

/// Everything a booking email needs, resolved by the caller so templates stay pure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSummary {
    pub booking_id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub practice_name: String,
    pub practice_email: String,
    pub dentist_name: String,
    pub treatment_name: String,
    pub appointment_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum NotificationEvent {
    /// New booking, sent to the practice.
    BookingCreated(BookingSummary),
    /// Receipt sent to the patient.
    BookingReceived(BookingSummary),
    ApprovalChanged {
        summary: BookingSummary,
        approval: ApprovalStatus,
    },
    /// Sent to whichever party did not cancel.
    BookingCancelled {
        summary: BookingSummary,
        cancelled_by: CancellationActor,
        reason: Option<String>,
    },
    Welcome {
        email: String,
        full_name: Option<String>,
        verification_token: String,
    },
    PasswordReset {
        email: String,
        reset_token: String,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::BookingCreated(_) => "booking_created",
            NotificationEvent::BookingReceived(_) => "booking_received",
            NotificationEvent::ApprovalChanged { .. } => "approval_changed",
            NotificationEvent::BookingCancelled { .. } => "booking_cancelled",
            NotificationEvent::Welcome { .. } => "welcome",
            NotificationEvent::PasswordReset { .. } => "password_reset",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            NotificationEvent::BookingCreated(summary) => &summary.practice_email,
            NotificationEvent::BookingReceived(summary) => &summary.patient_email,
            NotificationEvent::ApprovalChanged { summary, .. } => &summary.patient_email,
            NotificationEvent::BookingCancelled {
                summary,
                cancelled_by,
                ..
            } => match cancelled_by {
                CancellationActor::Patient => &summary.practice_email,
                CancellationActor::Practice => &summary.patient_email,
            },
            NotificationEvent::Welcome { email, .. } => email,
            NotificationEvent::PasswordReset { email, .. } => email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    Delivered,
    /// No transport configured; nothing was attempted.
    Suppressed,
    Failed,
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Mail transport not configured")]
    NotConfigured,

    #[error("Mail request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Mail provider rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Mail delivery timed out after {0}ms")]
    Timeout(u64),
}
