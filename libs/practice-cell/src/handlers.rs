// libs/practice-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_utils::json::ValidJson;

use crate::models::{AvailableSlotsQuery, PracticeAccessRequest, PracticeSearchQuery, TreatmentQuery};
use crate::services::PracticeDirectoryService;

#[axum::debug_handler]
pub async fn list_treatments(
    State(service): State<Arc<PracticeDirectoryService>>,
    Query(query): Query<TreatmentQuery>,
) -> Result<Json<Value>, AppError> {
    let treatments = service.list_treatments(query.category).await?;
    Ok(Json(json!(treatments)))
}

#[axum::debug_handler]
pub async fn search_practices(
    State(service): State<Arc<PracticeDirectoryService>>,
    Query(query): Query<PracticeSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let practices = service.search_practices(&query.to_filter()).await?;
    Ok(Json(json!(practices)))
}

#[axum::debug_handler]
pub async fn access_practice(
    State(service): State<Arc<PracticeDirectoryService>>,
    ValidJson(request): ValidJson<PracticeAccessRequest>,
) -> Result<Json<Value>, AppError> {
    let access = service.access_practice(&request.practice_tag).await?;
    Ok(Json(json!(access)))
}

#[axum::debug_handler]
pub async fn list_dentists(
    State(service): State<Arc<PracticeDirectoryService>>,
    Path(practice_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let dentists = service.list_dentists(practice_id).await?;
    Ok(Json(json!(dentists)))
}

#[axum::debug_handler]
pub async fn list_available(
    State(service): State<Arc<PracticeDirectoryService>>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = service.list_available(&query).await?;
    Ok(Json(json!(slots)))
}
