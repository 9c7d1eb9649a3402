use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::entities::{AccessibilityNeed, PatientDetails, TreatmentCategory};

use crate::error::ClientError;
use crate::gateway::BookingGateway;
use crate::models::{BookingSubmission, CreatedBooking};
use crate::session::SessionContext;

pub const FIRST_STEP: u8 = 1;
pub const LAST_STEP: u8 = 4;

/// Step 3 is where the practice, dentist and slot are chosen.
pub const SELECTION_STEP: u8 = 3;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDraft {
    pub category: Option<TreatmentCategory>,
    pub accessibility_needs: Vec<AccessibilityNeed>,
    pub practice_id: Option<Uuid>,
    pub dentist_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub patient: PatientDetails,
}

/// A partial form update. Every `Some` field replaces the draft's value.
#[derive(Debug, Clone, Default)]
pub struct DraftUpdate {
    pub category: Option<TreatmentCategory>,
    pub accessibility_needs: Option<Vec<AccessibilityNeed>>,
    pub practice_id: Option<Uuid>,
    pub dentist_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub patient: Option<PatientDetails>,
}

/// Four-step booking wizard: treatment, accessibility, practice and slot,
/// confirmation. Nothing touches the network until [`BookingFlow::submit`].
#[derive(Debug, Clone)]
pub struct BookingFlow {
    step: u8,
    draft: BookingDraft,
}

impl Default for BookingFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingFlow {
    pub fn new() -> Self {
        Self {
            step: FIRST_STEP,
            draft: BookingDraft::default(),
        }
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn advance(&mut self) -> u8 {
        if self.step < LAST_STEP {
            self.step += 1;
        }
        self.step
    }

    pub fn back(&mut self) -> u8 {
        if self.step > FIRST_STEP {
            self.step -= 1;
        }
        self.step
    }

    pub fn update(&mut self, update: DraftUpdate) {
        let draft = &mut self.draft;
        if let Some(category) = update.category {
            draft.category = Some(category);
        }
        if let Some(needs) = update.accessibility_needs {
            draft.accessibility_needs = needs;
        }
        if let Some(practice_id) = update.practice_id {
            draft.practice_id = Some(practice_id);
        }
        if let Some(dentist_id) = update.dentist_id {
            draft.dentist_id = Some(dentist_id);
        }
        if let Some(appointment_id) = update.appointment_id {
            draft.appointment_id = Some(appointment_id);
        }
        if let Some(patient) = update.patient {
            draft.patient = patient;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Build the request body from the draft. The accessibility answers from
    /// step 2 travel with the patient details.
    pub fn submission(&self) -> Result<BookingSubmission, ClientError> {
        let appointment_id = self
            .draft
            .appointment_id
            .ok_or_else(|| ClientError::IncompleteDraft("no appointment selected".to_string()))?;
        if self.draft.patient.full_name.trim().is_empty() {
            return Err(ClientError::IncompleteDraft("full name is required".to_string()));
        }
        if self.draft.patient.email.trim().is_empty() {
            return Err(ClientError::IncompleteDraft("email is required".to_string()));
        }

        let mut patient = self.draft.patient.clone();
        patient.accessibility_needs = self.draft.accessibility_needs.clone();

        Ok(BookingSubmission {
            appointment_id,
            patient,
        })
    }

    /// Create the booking. Success resets the flow. A taken slot sends the
    /// patient back to slot selection with the rest of the draft intact; any
    /// other failure leaves the flow untouched.
    pub async fn submit(
        &mut self,
        gateway: &dyn BookingGateway,
        session: &SessionContext,
    ) -> Result<CreatedBooking, ClientError> {
        let token = session.token().ok_or(ClientError::NotAuthenticated)?;
        let submission = self.submission()?;

        debug!("Submitting booking for appointment {}", submission.appointment_id);
        match gateway.create_booking(&token, &submission).await {
            Ok(created) => {
                info!("Booking {} created", created.booking.id);
                self.reset();
                Ok(created)
            }
            Err(e) if e.is_slot_conflict() => {
                warn!("Appointment {} was taken, returning to selection", submission.appointment_id);
                self.draft.appointment_id = None;
                self.step = SELECTION_STEP;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_is_clamped_to_bounds() {
        let mut flow = BookingFlow::new();
        assert_eq!(flow.back(), 1);

        assert_eq!(flow.advance(), 2);
        assert_eq!(flow.advance(), 3);
        assert_eq!(flow.advance(), 4);
        assert_eq!(flow.advance(), 4);

        assert_eq!(flow.back(), 3);
    }

    #[test]
    fn later_updates_win() {
        let mut flow = BookingFlow::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        flow.update(DraftUpdate {
            category: Some(TreatmentCategory::Routine),
            practice_id: Some(first),
            ..Default::default()
        });
        flow.update(DraftUpdate {
            practice_id: Some(second),
            ..Default::default()
        });

        assert_eq!(flow.draft().category, Some(TreatmentCategory::Routine));
        assert_eq!(flow.draft().practice_id, Some(second));
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut flow = BookingFlow::new();
        flow.advance();
        flow.update(DraftUpdate {
            accessibility_needs: Some(vec![AccessibilityNeed::Wheelchair]),
            ..Default::default()
        });

        flow.reset();

        assert_eq!(flow.step(), FIRST_STEP);
        assert_eq!(flow.draft(), &BookingDraft::default());
    }

    #[test]
    fn submission_requires_slot_and_contact_details() {
        let mut flow = BookingFlow::new();
        assert!(matches!(flow.submission(), Err(ClientError::IncompleteDraft(_))));

        flow.update(DraftUpdate {
            appointment_id: Some(Uuid::new_v4()),
            accessibility_needs: Some(vec![AccessibilityNeed::Parking]),
            patient: Some(PatientDetails {
                full_name: "Pat Ient".to_string(),
                email: "pat@example.com".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });

        let submission = flow.submission().unwrap();
        assert_eq!(submission.patient.accessibility_needs, vec![AccessibilityNeed::Parking]);
    }
}
