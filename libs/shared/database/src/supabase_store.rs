use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::entities::{
    AccessibilityNeed, Appointment, Booking, Dentist, NewAppointment, NewBooking, NewDentist,
    NewPractice, NewSession, NewTreatment, NewUser, Practice, Session, Treatment,
    TreatmentCategory, User,
};

use crate::store::{
    BookedSlot, BookingStore, BookingTransition, PracticeFilter, SlotFilter, StoreError,
    StoreResult,
};
use crate::supabase::{DatabaseError, SupabaseClient};

/// `BookingStore` over Supabase/PostgREST. The two multi-row writes are SQL
/// functions (see `migrations/001_init.sql`) so Postgres runs them in a single
/// transaction with row locks.
pub struct SupabaseStore {
    supabase: SupabaseClient,
}

fn classify(err: DatabaseError, entity: &'static str, id: impl ToString) -> StoreError {
    match err {
        DatabaseError::Api { status, code, message } => match code.as_deref() {
            Some("23505") => StoreError::Duplicate(message),
            Some("23503") => StoreError::NotFound {
                entity: "reference",
                id: message,
            },
            Some("PT404") => StoreError::not_found(entity, id),
            Some("PT409") => StoreError::Conflict(message),
            Some("PT412") => StoreError::Stale(message),
            _ => match status {
                StatusCode::NOT_FOUND => StoreError::not_found(entity, id),
                _ => StoreError::Backend(format!("{} ({})", message, status)),
            },
        },
        other => StoreError::Backend(other.to_string()),
    }
}

fn need_column(need: AccessibilityNeed) -> &'static str {
    match need {
        AccessibilityNeed::Wheelchair => "wheelchair_access",
        AccessibilityNeed::SignLanguage => "sign_language",
        AccessibilityNeed::VisualImpairment => "visual_impairment_support",
        AccessibilityNeed::Cognitive => "cognitive_support",
        AccessibilityNeed::Parking => "parking",
    }
}

fn to_body<T: serde::Serialize>(value: &T) -> StoreResult<Value> {
    serde_json::to_value(value).map_err(|e| StoreError::Backend(e.to_string()))
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn select<T: DeserializeOwned>(
        &self,
        path: &str,
        entity: &'static str,
    ) -> StoreResult<Vec<T>> {
        debug!("Selecting {} via {}", entity, path);
        self.supabase
            .request::<Vec<T>>(Method::GET, path, None, None)
            .await
            .map_err(|e| classify(e, entity, path))
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        path: &str,
        entity: &'static str,
    ) -> StoreResult<Option<T>> {
        let rows = self.select::<T>(path, entity).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert<T: DeserializeOwned>(
        &self,
        table: &str,
        body: Value,
        entity: &'static str,
    ) -> StoreResult<T> {
        let path = format!("/rest/v1/{}", table);
        let rows: Vec<T> = self
            .supabase
            .request_returning(Method::POST, &path, Some(body))
            .await
            .map_err(|e| classify(e, entity, table))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend(format!("insert into {} returned no rows", table)))
    }
}

#[async_trait]
impl BookingStore for SupabaseStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        self.insert("users", to_body(&user)?, "user").await
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.select_one(&format!("/rest/v1/users?id=eq.{}&limit=1", id), "user")
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let path = format!(
            "/rest/v1/users?email=eq.{}&limit=1",
            urlencoding::encode(email)
        );
        self.select_one(&path, "user").await
    }

    async fn find_user_by_verification_token(&self, token: &str) -> StoreResult<Option<User>> {
        let path = format!(
            "/rest/v1/users?verification_token=eq.{}&limit=1",
            urlencoding::encode(token)
        );
        self.select_one(&path, "user").await
    }

    async fn find_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>> {
        let path = format!(
            "/rest/v1/users?reset_token=eq.{}&limit=1",
            urlencoding::encode(token)
        );
        self.select_one(&path, "user").await
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let path = format!("/rest/v1/users?id=eq.{}", user.id);
        let body = json!({
            "email": user.email,
            "password_hash": user.password_hash,
            "full_name": user.full_name,
            "verified": user.verified,
            "verification_token": user.verification_token,
            "reset_token": user.reset_token,
            "reset_token_expires_at": user.reset_token_expires_at,
        });

        let rows: Vec<User> = self
            .supabase
            .request_returning(Method::PATCH, &path, Some(body))
            .await
            .map_err(|e| classify(e, "user", user.id))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found("user", user.id))
    }

    async fn insert_session(&self, session: NewSession) -> StoreResult<Session> {
        self.insert("sessions", to_body(&session)?, "session").await
    }

    async fn get_session(&self, id: &str) -> StoreResult<Option<Session>> {
        let path = format!(
            "/rest/v1/sessions?id=eq.{}&limit=1",
            urlencoding::encode(id)
        );
        self.select_one(&path, "session").await
    }

    async fn delete_session(&self, id: &str) -> StoreResult<bool> {
        let path = format!("/rest/v1/sessions?id=eq.{}", urlencoding::encode(id));
        let rows: Vec<Session> = self
            .supabase
            .request_returning(Method::DELETE, &path, None)
            .await
            .map_err(|e| classify(e, "session", id))?;
        Ok(!rows.is_empty())
    }

    async fn insert_practice(&self, practice: NewPractice) -> StoreResult<Practice> {
        self.insert("practices", to_body(&practice)?, "practice").await
    }

    async fn get_practice(&self, id: Uuid) -> StoreResult<Option<Practice>> {
        self.select_one(&format!("/rest/v1/practices?id=eq.{}&limit=1", id), "practice")
            .await
    }

    async fn find_practice_by_tag(&self, tag: &str) -> StoreResult<Option<Practice>> {
        let path = format!(
            "/rest/v1/practices?practice_tag=eq.{}&limit=1",
            urlencoding::encode(tag)
        );
        self.select_one(&path, "practice").await
    }

    async fn list_practices(&self, filter: &PracticeFilter) -> StoreResult<Vec<Practice>> {
        let mut query_parts = vec!["order=name.asc".to_string()];

        if let Some(prefix) = &filter.postcode_prefix {
            let pattern = format!("{}*", prefix.trim().to_ascii_uppercase());
            query_parts.push(format!("postcode=ilike.{}", urlencoding::encode(&pattern)));
        }
        for need in &filter.needs {
            query_parts.push(format!("{}=is.true", need_column(*need)));
        }

        let path = format!("/rest/v1/practices?{}", query_parts.join("&"));
        self.select(&path, "practice").await
    }

    async fn insert_treatment(&self, treatment: NewTreatment) -> StoreResult<Treatment> {
        self.insert("treatments", to_body(&treatment)?, "treatment").await
    }

    async fn get_treatment(&self, id: Uuid) -> StoreResult<Option<Treatment>> {
        self.select_one(&format!("/rest/v1/treatments?id=eq.{}&limit=1", id), "treatment")
            .await
    }

    async fn list_treatments(&self, category: Option<TreatmentCategory>) -> StoreResult<Vec<Treatment>> {
        let path = match category {
            Some(category) => format!(
                "/rest/v1/treatments?category=eq.{}&order=name.asc",
                category.as_str()
            ),
            None => "/rest/v1/treatments?order=name.asc".to_string(),
        };
        self.select(&path, "treatment").await
    }

    async fn insert_dentist(&self, dentist: NewDentist) -> StoreResult<Dentist> {
        self.insert("dentists", to_body(&dentist)?, "dentist").await
    }

    async fn get_dentist(&self, id: Uuid) -> StoreResult<Option<Dentist>> {
        self.select_one(&format!("/rest/v1/dentists?id=eq.{}&limit=1", id), "dentist")
            .await
    }

    async fn list_dentists(&self, practice_id: Uuid) -> StoreResult<Vec<Dentist>> {
        let path = format!(
            "/rest/v1/dentists?practice_id=eq.{}&order=full_name.asc",
            practice_id
        );
        self.select(&path, "dentist").await
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> StoreResult<Appointment> {
        let mut body = to_body(&appointment)?;
        body["status"] = json!("available");
        self.insert("appointments", body, "appointment").await
    }

    async fn get_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        self.select_one(
            &format!("/rest/v1/appointments?id=eq.{}&limit=1", id),
            "appointment",
        )
        .await
    }

    async fn list_available_appointments(&self, filter: &SlotFilter) -> StoreResult<Vec<Appointment>> {
        let mut query_parts = vec![
            "status=eq.available".to_string(),
            "order=appointment_date.asc".to_string(),
        ];

        if let Some(practice_id) = filter.practice_id {
            query_parts.push(format!("practice_id=eq.{}", practice_id));
        }
        if let Some(after) = filter.after {
            let date_str = after.to_rfc3339();
            query_parts.push(format!(
                "appointment_date=gt.{}",
                urlencoding::encode(&date_str)
            ));
        }
        if let Some(category) = filter.category {
            // Inner-join the catalog so the category filter drops non-matching slots.
            query_parts.push("select=*,treatments!inner(category)".to_string());
            query_parts.push(format!("treatments.category=eq.{}", category.as_str()));
        }

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        self.select(&path, "appointment").await
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        self.select_one(&format!("/rest/v1/bookings?id=eq.{}&limit=1", id), "booking")
            .await
    }

    async fn list_bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Booking>> {
        let path = format!(
            "/rest/v1/bookings?user_id=eq.{}&order=created_at.desc",
            user_id
        );
        self.select(&path, "booking").await
    }

    async fn list_bookings_for_practice(&self, practice_id: Uuid) -> StoreResult<Vec<Booking>> {
        let path = format!(
            "/rest/v1/bookings?practice_id=eq.{}&order=appointment_date.asc",
            practice_id
        );
        self.select(&path, "booking").await
    }

    async fn list_bookings_for_appointment(&self, appointment_id: Uuid) -> StoreResult<Vec<Booking>> {
        let path = format!(
            "/rest/v1/bookings?appointment_id=eq.{}&order=created_at.asc",
            appointment_id
        );
        self.select(&path, "booking").await
    }

    async fn book_slot(&self, booking: NewBooking) -> StoreResult<BookedSlot> {
        let appointment_id = booking.appointment_id;
        let params = json!({
            "p_user_id": booking.user_id,
            "p_appointment_id": booking.appointment_id,
            "p_patient": to_body(&booking.patient)?,
        });

        self.supabase
            .rpc::<BookedSlot>("book_appointment_slot", params)
            .await
            .map_err(|e| {
                let err = classify(e, "appointment", appointment_id);
                if matches!(err, StoreError::Conflict(_)) {
                    warn!("Slot {} lost a booking race", appointment_id);
                }
                err
            })
    }

    async fn apply_transition(&self, transition: BookingTransition) -> StoreResult<BookedSlot> {
        let booking_id = transition.booking_id;
        let (appointment_status, release_user) = match &transition.appointment {
            Some(change) => (Some(change.status.as_str()), change.release_user),
            None => (None, false),
        };

        let params = json!({
            "p_booking_id": transition.booking_id,
            "p_expected_status": transition.expected_status.as_str(),
            "p_expected_approval": transition.expected_approval.as_str(),
            "p_status": transition.status.as_str(),
            "p_approval_status": transition.approval_status.as_str(),
            "p_payment_status": transition.payment_status.map(|p| p.as_str()),
            "p_cancelled_by": transition.cancelled_by,
            "p_cancellation_reason": transition.cancellation_reason,
            "p_appointment_status": appointment_status,
            "p_release_user": release_user,
        });

        self.supabase
            .rpc::<BookedSlot>("apply_booking_transition", params)
            .await
            .map_err(|e| classify(e, "booking", booking_id))
    }
}
