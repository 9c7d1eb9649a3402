// libs/practice-cell/src/services/directory.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{BookingStore, PracticeFilter, SlotFilter};
use shared_models::entities::{Dentist, Practice, Treatment, TreatmentCategory};

use crate::models::{AvailableSlot, AvailableSlotsQuery, PracticeAccess, PracticeError};
use crate::services::geo::haversine_km;

/// Read side of the practice directory: catalog, search, PIN gate and open slots.
pub struct PracticeDirectoryService {
    store: Arc<dyn BookingStore>,
}

struct GeoFilter {
    lat: f64,
    long: f64,
    radius_km: f64,
}

fn geo_filter(query: &AvailableSlotsQuery) -> Result<Option<GeoFilter>, PracticeError> {
    match (query.lat, query.long, query.radius_km) {
        (None, None, None) => Ok(None),
        (Some(lat), Some(long), Some(radius_km)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&long) {
                return Err(PracticeError::Validation("Coordinates out of range".to_string()));
            }
            if radius_km <= 0.0 {
                return Err(PracticeError::Validation("radiusKm must be positive".to_string()));
            }
            Ok(Some(GeoFilter { lat, long, radius_km }))
        }
        _ => Err(PracticeError::Validation(
            "lat, long and radiusKm must be given together".to_string(),
        )),
    }
}

impl PracticeDirectoryService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub async fn list_treatments(
        &self,
        category: Option<TreatmentCategory>,
    ) -> Result<Vec<Treatment>, PracticeError> {
        Ok(self.store.list_treatments(category).await?)
    }

    pub async fn search_practices(&self, filter: &PracticeFilter) -> Result<Vec<Practice>, PracticeError> {
        debug!("Searching practices: {:?}", filter);
        Ok(self.store.list_practices(filter).await?)
    }

    /// Exchange a practice tag for the practice, its dentists and its open slots.
    pub async fn access_practice(&self, tag: &str) -> Result<PracticeAccess, PracticeError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(PracticeError::Validation("Practice tag is required".to_string()));
        }

        let practice = match self.store.find_practice_by_tag(tag).await? {
            Some(practice) => practice,
            None => {
                warn!("Practice access attempted with unknown tag");
                return Err(PracticeError::UnknownTag);
            }
        };

        let dentists = self.store.list_dentists(practice.id).await?;
        let available_slots = self
            .store
            .list_available_appointments(&SlotFilter {
                practice_id: Some(practice.id),
                category: None,
                after: Some(Utc::now()),
            })
            .await?;

        info!("Practice {} accessed by tag", practice.id);
        Ok(PracticeAccess {
            practice,
            dentists,
            available_slots,
        })
    }

    pub async fn list_dentists(&self, practice_id: Uuid) -> Result<Vec<Dentist>, PracticeError> {
        if self.store.get_practice(practice_id).await?.is_none() {
            return Err(PracticeError::PracticeNotFound);
        }
        Ok(self.store.list_dentists(practice_id).await?)
    }

    /// Future `available` slots by category and, optionally, distance from a
    /// point. Ordered by appointment date.
    pub async fn list_available(&self, query: &AvailableSlotsQuery) -> Result<Vec<AvailableSlot>, PracticeError> {
        let geo = geo_filter(query)?;

        let appointments = self
            .store
            .list_available_appointments(&SlotFilter {
                practice_id: query.practice_id,
                category: query.category,
                after: Some(Utc::now()),
            })
            .await?;

        let mut practices: HashMap<Uuid, Option<Practice>> = HashMap::new();
        let mut slots = Vec::with_capacity(appointments.len());

        for appointment in appointments {
            if !practices.contains_key(&appointment.practice_id) {
                let practice = self.store.get_practice(appointment.practice_id).await?;
                practices.insert(appointment.practice_id, practice);
            }
            let Some(Some(practice)) = practices.get(&appointment.practice_id) else {
                continue;
            };

            let distance_km = geo
                .as_ref()
                .map(|g| haversine_km(g.lat, g.long, practice.latitude, practice.longitude));

            if let (Some(g), Some(distance)) = (&geo, distance_km) {
                if distance > g.radius_km {
                    continue;
                }
            }

            slots.push(AvailableSlot {
                practice_name: practice.name.clone(),
                appointment,
                distance_km,
            });
        }

        debug!("Found {} available slots", slots.len());
        Ok(slots)
    }
}
