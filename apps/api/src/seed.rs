use chrono::{Datelike, Duration, TimeZone, Utc, Weekday};
use tracing::info;

use auth_cell::PasswordService;
use shared_database::{BookingStore, StoreError, StoreResult};
use shared_models::entities::{
    AccessibilityFeatures, NewAppointment, NewDentist, NewPractice, NewTreatment, NewUser,
    Practice, TreatmentCategory, UserType,
};

pub const DEMO_PRACTICE_TAG: &str = "SMILE-2024";
pub const DEMO_PATIENT_EMAIL: &str = "patient@dentbook.app";
pub const DEMO_DENTIST_EMAIL: &str = "dentist@dentbook.app";
pub const DEMO_PASSWORD: &str = "dentbook-demo";

const SEED_DAYS: i64 = 7;
const CLINIC_HOURS: [u32; 6] = [9, 10, 11, 14, 15, 16];

/// Populate an empty store with one practice, its treatments, two dentists,
/// a week of weekday slots and a demo account of each type.
pub async fn seed_demo_data(store: &dyn BookingStore) -> StoreResult<Practice> {
    let practice = store
        .insert_practice(NewPractice {
            name: "Harbourside Dental".to_string(),
            address: "12 Narrow Quay, Bristol".to_string(),
            postcode: "BS1 4QA".to_string(),
            latitude: 51.4498,
            longitude: -2.5967,
            phone: "0117 496 0123".to_string(),
            email: "reception@harbourside.example".to_string(),
            practice_tag: DEMO_PRACTICE_TAG.to_string(),
            rating: 4.7,
            accessibility: AccessibilityFeatures {
                wheelchair_access: true,
                sign_language: true,
                visual_impairment_support: false,
                cognitive_support: true,
                parking: true,
            },
        })
        .await?;

    let mut treatments = Vec::new();
    for (name, category, minutes, price_pence) in [
        ("Emergency Appointment", TreatmentCategory::Emergency, 30, 9500),
        ("Urgent Pain Relief", TreatmentCategory::Urgent, 30, 6000),
        ("Check-up and Clean", TreatmentCategory::Routine, 45, 4500),
        ("Teeth Whitening", TreatmentCategory::Cosmetic, 60, 29900),
    ] {
        treatments.push(
            store
                .insert_treatment(NewTreatment {
                    name: name.to_string(),
                    category,
                    duration_minutes: minutes,
                    price_pence,
                })
                .await?,
        );
    }

    let mut dentists = Vec::new();
    for (full_name, specialization, experience_years, languages) in [
        ("Priya Shah", "General Dentistry", 12, vec!["English", "Gujarati"]),
        ("Tom Hale", "Cosmetic Dentistry", 7, vec!["English", "BSL"]),
    ] {
        dentists.push(
            store
                .insert_dentist(NewDentist {
                    practice_id: practice.id,
                    title: "Dr.".to_string(),
                    full_name: full_name.to_string(),
                    specialization: specialization.to_string(),
                    experience_years,
                    languages: languages.into_iter().map(str::to_string).collect(),
                    available_days: vec![1, 2, 3, 4, 5],
                })
                .await?,
        );
    }

    let today = Utc::now().date_naive();
    let mut slots = 0;
    for day in 1..=SEED_DAYS {
        let date = today + Duration::days(day);
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }
        for (i, hour) in CLINIC_HOURS.iter().enumerate() {
            let Some(naive) = date.and_hms_opt(*hour, 0, 0) else {
                continue;
            };
            let at = Utc.from_utc_datetime(&naive);
            for (d, dentist) in dentists.iter().enumerate() {
                let treatment = &treatments[(i + d) % treatments.len()];
                store
                    .insert_appointment(NewAppointment {
                        practice_id: practice.id,
                        dentist_id: dentist.id,
                        treatment_id: treatment.id,
                        appointment_date: at,
                    })
                    .await?;
                slots += 1;
            }
        }
    }

    let password_hash =
        PasswordService::hash_password(DEMO_PASSWORD).map_err(|e| StoreError::Backend(e.to_string()))?;
    for (email, user_type, practice_id, full_name) in [
        (DEMO_PATIENT_EMAIL, UserType::Patient, None, "Demo Patient"),
        (DEMO_DENTIST_EMAIL, UserType::Dentist, Some(practice.id), "Priya Shah"),
    ] {
        let mut user = store
            .insert_user(NewUser {
                email: email.to_string(),
                password_hash: password_hash.clone(),
                user_type,
                practice_id,
                full_name: Some(full_name.to_string()),
                verification_token: None,
            })
            .await?;
        user.verified = true;
        store.update_user(&user).await?;
    }

    info!(
        "Seeded practice {} (tag {}) with {} treatments, {} dentists and {} slots",
        practice.name,
        DEMO_PRACTICE_TAG,
        treatments.len(),
        dentists.len(),
        slots
    );
    info!("Demo accounts: {} / {} (password {})", DEMO_PATIENT_EMAIL, DEMO_DENTIST_EMAIL, DEMO_PASSWORD);

    Ok(practice)
}
