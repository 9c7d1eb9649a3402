use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, StorageBackend};
use shared_database::{BookingStore, StoreResult};
use shared_models::auth::{AuthUser, JwtClaims};
use shared_models::entities::{
    AccessibilityFeatures, Appointment, Dentist, NewAppointment, NewDentist, NewPractice,
    NewTreatment, NewUser, PatientDetails, Practice, Treatment, TreatmentCategory, User, UserType,
};

use crate::jwt::issue_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub mail_api_url: String,
    pub mail_api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            mail_api_url: String::new(),
            mail_api_key: String::new(),
        }
    }
}

impl TestConfig {
    /// Point outbound mail at a mock server.
    pub fn with_mail_server(uri: &str) -> Self {
        Self {
            mail_api_url: uri.to_string(),
            mail_api_key: "test-mail-key".to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            storage_backend: StorageBackend::Memory,
            seed_demo_data: false,
            mail_api_key: self.mail_api_key.clone(),
            mail_api_url: self.mail_api_url.clone(),
            mail_from: "Dentbook Tests <tests@dentbook.app>".to_string(),
            app_base_url: "http://localhost:5173".to_string(),
            notification_timeout_ms: 500,
            session_ttl_hours: 24,
            port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub user_type: UserType,
    pub practice_id: Option<Uuid>,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::patient("test@example.com")
    }
}

impl TestUser {
    pub fn patient(email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            user_type: UserType::Patient,
            practice_id: None,
        }
    }

    pub fn dentist(email: &str, practice_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            user_type: UserType::Dentist,
            practice_id: Some(practice_id),
        }
    }

    /// Reuse the id of a stored account so store-side ownership checks line up.
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            user_type: user.user_type,
            practice_id: user.practice_id,
        }
    }

    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: Some(self.email.clone()),
            user_type: Some(self.user_type),
            practice_id: self.practice_id,
            session_id: None,
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let claims = JwtClaims {
            sub: user.id.to_string(),
            exp: Some(exp.timestamp().max(0) as u64),
            email: Some(user.email.clone()),
            role: Some(user.user_type.as_str().to_string()),
            practice_id: user.practice_id.map(|id| id.to_string()),
            sid: None,
            iat: Some(now.timestamp() as u64),
        };

        issue_token(&claims, secret).unwrap_or_default()
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }

    pub fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn postgrest_error(code: &str, message: &str) -> serde_json::Value {
        json!({
            "code": code,
            "message": message,
            "details": null,
            "hint": null
        })
    }
}

/// A practice with one dentist and one treatment per category, as most
/// booking scenarios need.
pub struct PracticeFixture {
    pub practice: Practice,
    pub dentist: Dentist,
    pub treatments: Vec<Treatment>,
    pub staff: User,
}

impl PracticeFixture {
    pub fn treatment(&self, category: TreatmentCategory) -> &Treatment {
        self.treatments
            .iter()
            .find(|t| t.category == category)
            .unwrap_or(&self.treatments[0])
    }

    pub async fn slot(
        &self,
        store: &dyn BookingStore,
        category: TreatmentCategory,
        at: DateTime<Utc>,
    ) -> StoreResult<Appointment> {
        store
            .insert_appointment(NewAppointment {
                practice_id: self.practice.id,
                dentist_id: self.dentist.id,
                treatment_id: self.treatment(category).id,
                appointment_date: at,
            })
            .await
    }
}

pub async fn seed_practice(store: &dyn BookingStore, tag: &str) -> StoreResult<PracticeFixture> {
    let slug = tag.to_ascii_lowercase();
    let practice = store
        .insert_practice(NewPractice {
            name: format!("Practice {}", tag),
            address: "1 High Street".to_string(),
            postcode: "BS1 4DJ".to_string(),
            latitude: 51.4545,
            longitude: -2.5879,
            phone: "0117 496 0000".to_string(),
            email: format!("reception-{}@practice.example", slug),
            practice_tag: tag.to_string(),
            rating: 4.5,
            accessibility: AccessibilityFeatures {
                wheelchair_access: true,
                parking: true,
                ..Default::default()
            },
        })
        .await?;

    let dentist = store
        .insert_dentist(NewDentist {
            practice_id: practice.id,
            title: "Dr.".to_string(),
            full_name: "Sam Enamel".to_string(),
            specialization: "General Dentistry".to_string(),
            experience_years: 9,
            languages: vec!["English".to_string()],
            available_days: vec![1, 2, 3, 4, 5],
        })
        .await?;

    let mut treatments = Vec::new();
    for (name, category, minutes, price) in [
        ("Emergency Visit", TreatmentCategory::Emergency, 30, 9500),
        ("Toothache Assessment", TreatmentCategory::Urgent, 20, 4500),
        ("Check-up", TreatmentCategory::Routine, 30, 2500),
        ("Whitening", TreatmentCategory::Cosmetic, 60, 25000),
    ] {
        treatments.push(
            store
                .insert_treatment(NewTreatment {
                    name: name.to_string(),
                    category,
                    duration_minutes: minutes,
                    price_pence: price,
                })
                .await?,
        );
    }

    let staff = store
        .insert_user(NewUser {
            email: format!("dentist-{}@practice.example", slug),
            password_hash: "not-a-real-hash".to_string(),
            user_type: UserType::Dentist,
            practice_id: Some(practice.id),
            full_name: Some("Sam Enamel".to_string()),
            verification_token: None,
        })
        .await?;

    Ok(PracticeFixture {
        practice,
        dentist,
        treatments,
        staff,
    })
}

pub async fn seed_patient(store: &dyn BookingStore, email: &str) -> StoreResult<User> {
    store
        .insert_user(NewUser {
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            user_type: UserType::Patient,
            practice_id: None,
            full_name: Some("Pat Ient".to_string()),
            verification_token: None,
        })
        .await
}

pub fn patient_details(email: &str) -> PatientDetails {
    PatientDetails {
        full_name: "Pat Ient".to_string(),
        email: email.to_string(),
        phone: Some("07700 900000".to_string()),
        anxiety_level: Some(2),
        ..Default::default()
    }
}
