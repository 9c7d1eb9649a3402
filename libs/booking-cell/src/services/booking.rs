// libs/booking-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use notification_cell::{BookingSummary, NotificationDispatcher, NotificationEvent};
use shared_database::{BookedSlot, BookingStore, BookingTransition, StoreError};
use shared_models::auth::AuthUser;
use shared_models::entities::{
    AppointmentStatus, ApprovalStatus, Booking, CancellationActor, NewBooking, PatientDetails,
};
use shared_utils::validation::is_valid_email;

use crate::models::{BookingError, CreateBookingRequest};
use crate::services::lifecycle::BookingLifecycle;

const MAX_STALE_RETRIES: usize = 3;

/// Which notifications a committed change fans out to.
enum BookingNotice {
    Created,
    ApprovalChanged(ApprovalStatus),
    Cancelled {
        by: CancellationActor,
        reason: Option<String>,
    },
}

pub struct BookingService {
    store: Arc<dyn BookingStore>,
    notifier: Arc<NotificationDispatcher>,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>, notifier: Arc<NotificationDispatcher>) -> Self {
        Self { store, notifier }
    }

    pub fn validate_patient_details(patient: &PatientDetails) -> Result<(), BookingError> {
        if patient.full_name.trim().is_empty() {
            return Err(BookingError::Validation("Patient name is required".to_string()));
        }
        if !is_valid_email(&patient.email) {
            return Err(BookingError::Validation("A valid email address is required".to_string()));
        }
        if let Some(level) = patient.anxiety_level {
            if !(1..=5).contains(&level) {
                return Err(BookingError::Validation(
                    "Anxiety level must be between 1 and 5".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Book an available slot for the calling patient.
    #[instrument(skip(self, user, request), fields(appointment_id = %request.appointment_id))]
    pub async fn create_booking(
        &self,
        user: &AuthUser,
        request: CreateBookingRequest,
    ) -> Result<BookedSlot, BookingError> {
        if !user.is_patient() {
            return Err(BookingError::Forbidden("Only patients can create bookings".to_string()));
        }
        Self::validate_patient_details(&request.patient)?;

        let appointment = self
            .store
            .get_appointment(request.appointment_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("appointment {}", request.appointment_id)))?;

        if appointment.status != AppointmentStatus::Available {
            warn!("Appointment {} is {}, rejecting booking", appointment.id, appointment.status);
            return Err(BookingError::Conflict(format!(
                "Appointment {} is no longer available",
                appointment.id
            )));
        }
        if appointment.appointment_date <= Utc::now() {
            return Err(BookingError::Validation(
                "Appointment date is in the past".to_string(),
            ));
        }

        let booked = self
            .store
            .book_slot(NewBooking {
                user_id: user.id,
                appointment_id: appointment.id,
                patient: request.patient,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => BookingError::Conflict(format!(
                    "Appointment {} is no longer available",
                    appointment.id
                )),
                other => other.into(),
            })?;

        info!("Booking {} created for appointment {}", booked.booking.id, appointment.id);
        self.notify_detached(&booked.booking, BookingNotice::Created);

        Ok(booked)
    }

    pub async fn set_approval_status(
        &self,
        user: &AuthUser,
        booking_id: Uuid,
        status: ApprovalStatus,
    ) -> Result<BookedSlot, BookingError> {
        let updated = self
            .transition_with_retry(booking_id, |booking| {
                Self::require_practice_staff(user, booking)?;
                BookingLifecycle::plan_approval(booking, status)
            })
            .await?;

        info!("Booking {} approval set to {}", booking_id, status);
        self.notify_detached(&updated.booking, BookingNotice::ApprovalChanged(status));
        Ok(updated)
    }

    pub async fn cancel_booking(
        &self,
        user: &AuthUser,
        booking_id: Uuid,
        reason: Option<String>,
    ) -> Result<BookedSlot, BookingError> {
        let mut actor = CancellationActor::Patient;
        let updated = self
            .transition_with_retry(booking_id, |booking| {
                actor = Self::cancellation_actor(user, booking)?;
                BookingLifecycle::plan_cancellation(booking, actor, reason.clone(), Utc::now())
            })
            .await?;

        info!(
            "Booking {} cancelled by {}; appointment now {}",
            booking_id, actor, updated.appointment.status
        );
        self.notify_detached(
            &updated.booking,
            BookingNotice::Cancelled {
                by: actor,
                reason: updated.booking.cancellation_reason.clone(),
            },
        );
        Ok(updated)
    }

    pub async fn complete_booking(
        &self,
        user: &AuthUser,
        booking_id: Uuid,
    ) -> Result<BookedSlot, BookingError> {
        let updated = self
            .transition_with_retry(booking_id, |booking| {
                Self::require_practice_staff(user, booking)?;
                BookingLifecycle::plan_completion(booking)
            })
            .await?;

        info!("Booking {} completed", booking_id);
        Ok(updated)
    }

    pub async fn get_booking(&self, user: &AuthUser, booking_id: Uuid) -> Result<Booking, BookingError> {
        let booking = self.load(booking_id).await?;
        if booking.user_id != user.id && !user.is_dentist_of(booking.practice_id) {
            return Err(BookingError::Forbidden("Not authorized to view this booking".to_string()));
        }
        Ok(booking)
    }

    /// Newest first.
    pub async fn list_bookings_for_user(
        &self,
        user: &AuthUser,
        user_id: Uuid,
    ) -> Result<Vec<Booking>, BookingError> {
        if user.id != user_id {
            return Err(BookingError::Forbidden("Not authorized to view these bookings".to_string()));
        }
        debug!("Listing bookings for user {}", user_id);
        Ok(self.store.list_bookings_for_user(user_id).await?)
    }

    pub async fn list_bookings_for_practice(
        &self,
        user: &AuthUser,
        practice_id: Uuid,
    ) -> Result<Vec<Booking>, BookingError> {
        if !user.is_dentist_of(practice_id) {
            return Err(BookingError::Forbidden("Not a member of this practice".to_string()));
        }
        Ok(self.store.list_bookings_for_practice(practice_id).await?)
    }

    async fn load(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", booking_id)))
    }

    fn require_practice_staff(user: &AuthUser, booking: &Booking) -> Result<(), BookingError> {
        if user.is_dentist_of(booking.practice_id) {
            Ok(())
        } else {
            Err(BookingError::Forbidden("Only the practice can do this".to_string()))
        }
    }

    fn cancellation_actor(user: &AuthUser, booking: &Booking) -> Result<CancellationActor, BookingError> {
        if user.is_dentist_of(booking.practice_id) {
            Ok(CancellationActor::Practice)
        } else if user.id == booking.user_id {
            Ok(CancellationActor::Patient)
        } else {
            Err(BookingError::Forbidden("Not authorized to cancel this booking".to_string()))
        }
    }

    /// Read, plan and conditionally apply. A `Stale` write means someone else
    /// moved the booking in between, so re-read and re-plan against the new state.
    async fn transition_with_retry<F>(
        &self,
        booking_id: Uuid,
        mut plan: F,
    ) -> Result<BookedSlot, BookingError>
    where
        F: FnMut(&Booking) -> Result<BookingTransition, BookingError>,
    {
        for attempt in 1..=MAX_STALE_RETRIES {
            let booking = self.load(booking_id).await?;
            let transition = plan(&booking)?;

            match self.store.apply_transition(transition).await {
                Ok(updated) => return Ok(updated),
                Err(StoreError::Stale(msg)) => {
                    warn!("Stale write on booking {} (attempt {}): {}", booking_id, attempt, msg);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(BookingError::Conflict(format!(
            "Booking {} changed concurrently, please retry",
            booking_id
        )))
    }

    fn notify_detached(&self, booking: &Booking, notice: BookingNotice) {
        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let booking = booking.clone();

        tokio::spawn(async move {
            let summary = match summarize(store.as_ref(), &booking).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!("Skipping notification for booking {}: {}", booking.id, e);
                    return;
                }
            };

            let events = match notice {
                BookingNotice::Created => vec![
                    NotificationEvent::BookingCreated(summary.clone()),
                    NotificationEvent::BookingReceived(summary),
                ],
                BookingNotice::ApprovalChanged(approval) => {
                    vec![NotificationEvent::ApprovalChanged { summary, approval }]
                }
                BookingNotice::Cancelled { by, reason } => vec![NotificationEvent::BookingCancelled {
                    summary,
                    cancelled_by: by,
                    reason,
                }],
            };

            for event in events {
                notifier.notify(event).await;
            }
        });
    }
}

async fn summarize(store: &dyn BookingStore, booking: &Booking) -> Result<BookingSummary, StoreError> {
    let practice = store
        .get_practice(booking.practice_id)
        .await?
        .ok_or_else(|| StoreError::not_found("practice", booking.practice_id))?;
    let dentist = store
        .get_dentist(booking.dentist_id)
        .await?
        .ok_or_else(|| StoreError::not_found("dentist", booking.dentist_id))?;
    let treatment = store
        .get_treatment(booking.treatment_id)
        .await?
        .ok_or_else(|| StoreError::not_found("treatment", booking.treatment_id))?;

    Ok(BookingSummary {
        booking_id: booking.id,
        patient_name: booking.patient.full_name.clone(),
        patient_email: booking.patient.email.clone(),
        practice_name: practice.name,
        practice_email: practice.email,
        dentist_name: dentist.display_name(),
        treatment_name: treatment.name,
        appointment_date: booking.appointment_date,
    })
}
