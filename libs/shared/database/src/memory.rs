use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::entities::{
    Appointment, AppointmentStatus, Booking, BookingStatus, Dentist, NewAppointment, NewBooking,
    NewDentist, NewPractice, NewSession, NewTreatment, NewUser, Practice, Session, Treatment,
    TreatmentCategory, User,
};

use crate::store::{
    BookedSlot, BookingStore, BookingTransition, PracticeFilter, SlotFilter, StoreError,
    StoreResult,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<String, Session>,
    practices: HashMap<Uuid, Practice>,
    treatments: HashMap<Uuid, Treatment>,
    dentists: HashMap<Uuid, Dentist>,
    appointments: HashMap<Uuid, Appointment>,
    bookings: HashMap<Uuid, Booking>,
}

/// Process-local store. Every operation runs under one lock, so each call is a
/// serialized, all-or-nothing transaction over all tables.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by_key(|row| key(row));
    rows
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;

        if tables
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Duplicate("users.email".to_string()));
        }
        if let Some(practice_id) = user.practice_id {
            if !tables.practices.contains_key(&practice_id) {
                return Err(StoreError::not_found("practice", practice_id));
            }
        }

        let record = user.into_record(Uuid::new_v4(), Utc::now());
        tables.users.insert(record.id, record.clone());
        debug!("Inserted user {}", record.id);
        Ok(record)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_verification_token(&self, token: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(existing.clone())
            }
            None => Err(StoreError::not_found("user", user.id)),
        }
    }

    async fn insert_session(&self, session: NewSession) -> StoreResult<Session> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&session.user_id) {
            return Err(StoreError::not_found("user", session.user_id));
        }
        let record = session.into_record(Utc::now());
        tables.sessions.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_session(&self, id: &str) -> StoreResult<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(id).cloned())
    }

    async fn delete_session(&self, id: &str) -> StoreResult<bool> {
        Ok(self.tables.write().await.sessions.remove(id).is_some())
    }

    async fn insert_practice(&self, practice: NewPractice) -> StoreResult<Practice> {
        let mut tables = self.tables.write().await;

        for existing in tables.practices.values() {
            if existing.practice_tag == practice.practice_tag {
                return Err(StoreError::Duplicate("practices.practice_tag".to_string()));
            }
            if existing.email.eq_ignore_ascii_case(&practice.email) {
                return Err(StoreError::Duplicate("practices.email".to_string()));
            }
        }

        let record = practice.into_record(Uuid::new_v4(), Utc::now());
        tables.practices.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_practice(&self, id: Uuid) -> StoreResult<Option<Practice>> {
        Ok(self.tables.read().await.practices.get(&id).cloned())
    }

    async fn find_practice_by_tag(&self, tag: &str) -> StoreResult<Option<Practice>> {
        let tables = self.tables.read().await;
        Ok(tables
            .practices
            .values()
            .find(|p| p.practice_tag == tag)
            .cloned())
    }

    async fn list_practices(&self, filter: &PracticeFilter) -> StoreResult<Vec<Practice>> {
        let tables = self.tables.read().await;
        let prefix = filter
            .postcode_prefix
            .as_ref()
            .map(|p| p.replace(' ', "").to_ascii_uppercase());

        let rows = tables
            .practices
            .values()
            .filter(|p| match &prefix {
                Some(prefix) => p
                    .postcode
                    .replace(' ', "")
                    .to_ascii_uppercase()
                    .starts_with(prefix.as_str()),
                None => true,
            })
            .filter(|p| p.accessibility.supports_all(&filter.needs))
            .cloned()
            .collect();

        Ok(sorted_by(rows, |p: &Practice| p.name.clone()))
    }

    async fn insert_treatment(&self, treatment: NewTreatment) -> StoreResult<Treatment> {
        let mut tables = self.tables.write().await;
        let record = treatment.into_record(Uuid::new_v4(), Utc::now());
        tables.treatments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_treatment(&self, id: Uuid) -> StoreResult<Option<Treatment>> {
        Ok(self.tables.read().await.treatments.get(&id).cloned())
    }

    async fn list_treatments(&self, category: Option<TreatmentCategory>) -> StoreResult<Vec<Treatment>> {
        let tables = self.tables.read().await;
        let rows = tables
            .treatments
            .values()
            .filter(|t| category.map_or(true, |c| t.category == c))
            .cloned()
            .collect();
        Ok(sorted_by(rows, |t: &Treatment| t.name.clone()))
    }

    async fn insert_dentist(&self, dentist: NewDentist) -> StoreResult<Dentist> {
        let mut tables = self.tables.write().await;
        if !tables.practices.contains_key(&dentist.practice_id) {
            return Err(StoreError::not_found("practice", dentist.practice_id));
        }
        let record = dentist.into_record(Uuid::new_v4(), Utc::now());
        tables.dentists.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_dentist(&self, id: Uuid) -> StoreResult<Option<Dentist>> {
        Ok(self.tables.read().await.dentists.get(&id).cloned())
    }

    async fn list_dentists(&self, practice_id: Uuid) -> StoreResult<Vec<Dentist>> {
        let tables = self.tables.read().await;
        let rows = tables
            .dentists
            .values()
            .filter(|d| d.practice_id == practice_id)
            .cloned()
            .collect();
        Ok(sorted_by(rows, |d: &Dentist| d.full_name.clone()))
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> StoreResult<Appointment> {
        let mut tables = self.tables.write().await;

        if !tables.practices.contains_key(&appointment.practice_id) {
            return Err(StoreError::not_found("practice", appointment.practice_id));
        }
        match tables.dentists.get(&appointment.dentist_id) {
            Some(d) if d.practice_id == appointment.practice_id => {}
            _ => return Err(StoreError::not_found("dentist", appointment.dentist_id)),
        }
        if !tables.treatments.contains_key(&appointment.treatment_id) {
            return Err(StoreError::not_found("treatment", appointment.treatment_id));
        }

        let record = appointment.into_record(Uuid::new_v4(), Utc::now());
        tables.appointments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn list_available_appointments(&self, filter: &SlotFilter) -> StoreResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let rows = tables
            .appointments
            .values()
            .filter(|a| a.status == AppointmentStatus::Available)
            .filter(|a| filter.practice_id.map_or(true, |id| a.practice_id == id))
            .filter(|a| filter.after.map_or(true, |after| a.appointment_date > after))
            .filter(|a| match filter.category {
                Some(category) => tables
                    .treatments
                    .get(&a.treatment_id)
                    .map_or(false, |t| t.category == category),
                None => true,
            })
            .cloned()
            .collect();
        Ok(sorted_by(rows, |a: &Appointment| a.appointment_date))
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn list_bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        let rows: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        let mut rows = sorted_by(rows, |b: &Booking| b.created_at);
        rows.reverse();
        Ok(rows)
    }

    async fn list_bookings_for_practice(&self, practice_id: Uuid) -> StoreResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        let rows = tables
            .bookings
            .values()
            .filter(|b| b.practice_id == practice_id)
            .cloned()
            .collect();
        Ok(sorted_by(rows, |b: &Booking| b.appointment_date))
    }

    async fn list_bookings_for_appointment(&self, appointment_id: Uuid) -> StoreResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        let rows = tables
            .bookings
            .values()
            .filter(|b| b.appointment_id == appointment_id)
            .cloned()
            .collect();
        Ok(sorted_by(rows, |b: &Booking| b.created_at))
    }

    async fn book_slot(&self, booking: NewBooking) -> StoreResult<BookedSlot> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let appointment = tables
            .appointments
            .get(&booking.appointment_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("appointment", booking.appointment_id))?;

        if appointment.status != AppointmentStatus::Available {
            return Err(StoreError::Conflict(format!(
                "appointment {} is {}",
                appointment.id, appointment.status
            )));
        }
        let has_active = tables
            .bookings
            .values()
            .any(|b| b.appointment_id == appointment.id && b.status != BookingStatus::Cancelled);
        if has_active {
            return Err(StoreError::Conflict(format!(
                "appointment {} already has an active booking",
                appointment.id
            )));
        }

        let mut updated = appointment;
        updated.status = AppointmentStatus::Booked;
        updated.user_id = Some(booking.user_id);
        updated.updated_at = now;

        let record = booking.into_record(Uuid::new_v4(), &updated, now);

        tables.appointments.insert(updated.id, updated.clone());
        tables.bookings.insert(record.id, record.clone());

        Ok(BookedSlot {
            booking: record,
            appointment: updated,
        })
    }

    async fn apply_transition(&self, transition: BookingTransition) -> StoreResult<BookedSlot> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let booking = tables
            .bookings
            .get(&transition.booking_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("booking", transition.booking_id))?;

        if booking.status != transition.expected_status
            || booking.approval_status != transition.expected_approval
        {
            return Err(StoreError::Stale(format!(
                "booking {} is {}/{}",
                booking.id, booking.status, booking.approval_status
            )));
        }

        let mut appointment = tables
            .appointments
            .get(&booking.appointment_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("appointment", booking.appointment_id))?;

        // Validate everything before touching either row.
        if let Some(change) = &transition.appointment {
            if appointment.status != AppointmentStatus::Booked {
                return Err(StoreError::Stale(format!(
                    "appointment {} is {}",
                    appointment.id, appointment.status
                )));
            }
            appointment.status = change.status;
            if change.release_user {
                appointment.user_id = None;
            }
            appointment.updated_at = now;
        }

        let mut updated = booking;
        updated.status = transition.status;
        updated.approval_status = transition.approval_status;
        if let Some(payment) = transition.payment_status {
            updated.payment_status = payment;
        }
        if transition.cancelled_by.is_some() {
            updated.cancelled_by = transition.cancelled_by;
            updated.cancellation_reason = transition.cancellation_reason;
        }
        updated.updated_at = now;

        tables.appointments.insert(appointment.id, appointment.clone());
        tables.bookings.insert(updated.id, updated.clone());

        Ok(BookedSlot {
            booking: updated,
            appointment,
        })
    }
}
