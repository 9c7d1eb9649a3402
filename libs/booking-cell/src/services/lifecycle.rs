// libs/booking-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use shared_database::{AppointmentChange, BookingTransition};
use shared_models::entities::{
    AppointmentStatus, ApprovalStatus, Booking, BookingStatus, CancellationActor, PaymentStatus,
};

use crate::models::BookingError;

/// Pure transition rules for bookings and their appointment slots. Each
/// `plan_*` method checks the current booking and returns the conditional
/// write the store must apply.
pub struct BookingLifecycle;

impl BookingLifecycle {
    pub fn valid_appointment_transitions(current: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current {
            AppointmentStatus::Available => vec![AppointmentStatus::Booked],
            AppointmentStatus::Booked => vec![
                AppointmentStatus::Available,
                AppointmentStatus::Cancelled,
                AppointmentStatus::Completed,
            ],
            AppointmentStatus::Cancelled | AppointmentStatus::Completed => vec![],
        }
    }

    pub fn valid_booking_transitions(current: BookingStatus) -> Vec<BookingStatus> {
        match current {
            BookingStatus::Confirmed => vec![BookingStatus::Cancelled, BookingStatus::Completed],
            BookingStatus::Cancelled | BookingStatus::Completed => vec![],
        }
    }

    fn require_confirmed(booking: &Booking, action: &str) -> Result<(), BookingError> {
        if booking.status.is_terminal() {
            warn!(
                "Rejected {} on booking {} in status {}",
                action, booking.id, booking.status
            );
            return Err(BookingError::InvalidState(format!(
                "Cannot {} a booking that is {}",
                action, booking.status
            )));
        }
        Ok(())
    }

    /// Reject a planned write whose booking or appointment move is not in the
    /// transition tables. A confirmed booking always holds a `booked` slot.
    fn guarded(booking: &Booking, transition: BookingTransition) -> Result<BookingTransition, BookingError> {
        if !Self::valid_booking_transitions(booking.status).contains(&transition.status) {
            return Err(BookingError::InvalidTransition(format!(
                "Booking cannot move from {} to {}",
                booking.status, transition.status
            )));
        }
        if let Some(change) = &transition.appointment {
            if !Self::valid_appointment_transitions(AppointmentStatus::Booked).contains(&change.status) {
                return Err(BookingError::InvalidTransition(format!(
                    "Appointment cannot move from {} to {}",
                    AppointmentStatus::Booked,
                    change.status
                )));
            }
        }
        Ok(transition)
    }

    fn base_transition(booking: &Booking) -> BookingTransition {
        BookingTransition {
            booking_id: booking.id,
            expected_status: booking.status,
            expected_approval: booking.approval_status,
            status: booking.status,
            approval_status: booking.approval_status,
            payment_status: None,
            cancelled_by: None,
            cancellation_reason: None,
            appointment: None,
        }
    }

    pub fn plan_approval(
        booking: &Booking,
        new_status: ApprovalStatus,
    ) -> Result<BookingTransition, BookingError> {
        if new_status == ApprovalStatus::Pending {
            return Err(BookingError::Validation(
                "Approval status must be approved or rejected".to_string(),
            ));
        }
        Self::require_confirmed(booking, "change approval of")?;

        if booking.approval_status.is_resolved() {
            warn!(
                "Booking {} already {}, refusing {}",
                booking.id, booking.approval_status, new_status
            );
            return Err(BookingError::InvalidTransition(format!(
                "Booking approval is already {}",
                booking.approval_status
            )));
        }

        debug!("Planning approval {} -> {} for {}", booking.approval_status, new_status, booking.id);
        Ok(BookingTransition {
            approval_status: new_status,
            ..Self::base_transition(booking)
        })
    }

    /// Cancel a confirmed booking. The slot goes back on the market if its date
    /// is still ahead of `now`, otherwise it is closed.
    pub fn plan_cancellation(
        booking: &Booking,
        actor: CancellationActor,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<BookingTransition, BookingError> {
        Self::require_confirmed(booking, "cancel")?;

        let appointment = if booking.appointment_date > now {
            AppointmentChange {
                status: AppointmentStatus::Available,
                release_user: true,
            }
        } else {
            AppointmentChange {
                status: AppointmentStatus::Cancelled,
                release_user: false,
            }
        };

        let payment_status = match booking.payment_status {
            PaymentStatus::Paid => Some(PaymentStatus::Refunded),
            _ => None,
        };

        Self::guarded(
            booking,
            BookingTransition {
                status: BookingStatus::Cancelled,
                payment_status,
                cancelled_by: Some(actor),
                cancellation_reason: reason.filter(|r| !r.trim().is_empty()),
                appointment: Some(appointment),
                ..Self::base_transition(booking)
            },
        )
    }

    pub fn plan_completion(booking: &Booking) -> Result<BookingTransition, BookingError> {
        Self::require_confirmed(booking, "complete")?;

        if booking.approval_status != ApprovalStatus::Approved {
            return Err(BookingError::InvalidTransition(format!(
                "Only approved bookings can be completed (approval is {})",
                booking.approval_status
            )));
        }

        Self::guarded(
            booking,
            BookingTransition {
                status: BookingStatus::Completed,
                appointment: Some(AppointmentChange {
                    status: AppointmentStatus::Completed,
                    release_user: false,
                }),
                ..Self::base_transition(booking)
            },
        )
    }
}
