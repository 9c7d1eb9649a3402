// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_utils::json::ValidJson;

use crate::models::{ApprovalRequest, CancelBookingRequest, CreateBookingRequest};
use crate::services::BookingService;

#[axum::debug_handler]
pub async fn create_booking(
    State(service): State<Arc<BookingService>>,
    Extension(user): Extension<AuthUser>,
    ValidJson(request): ValidJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let booked = service.create_booking(&user, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "booking": booked.booking,
            "appointment": booked.appointment,
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(service): State<Arc<BookingService>>,
    Path(booking_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let booking = service.get_booking(&user, booking_id).await?;
    Ok(Json(json!(booking)))
}

#[axum::debug_handler]
pub async fn set_approval_status(
    State(service): State<Arc<BookingService>>,
    Path(booking_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    ValidJson(request): ValidJson<ApprovalRequest>,
) -> Result<Json<Value>, AppError> {
    let updated = service
        .set_approval_status(&user, booking_id, request.status)
        .await?;
    Ok(Json(json!(updated.booking)))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(service): State<Arc<BookingService>>,
    Path(booking_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    body: Option<ValidJson<CancelBookingRequest>>,
) -> Result<Json<Value>, AppError> {
    let reason = body.and_then(|ValidJson(request)| request.reason);
    let updated = service.cancel_booking(&user, booking_id, reason).await?;

    Ok(Json(json!({
        "booking": updated.booking,
        "appointment": updated.appointment,
    })))
}

#[axum::debug_handler]
pub async fn complete_booking(
    State(service): State<Arc<BookingService>>,
    Path(booking_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let updated = service.complete_booking(&user, booking_id).await?;

    Ok(Json(json!({
        "booking": updated.booking,
        "appointment": updated.appointment,
    })))
}

#[axum::debug_handler]
pub async fn list_user_bookings(
    State(service): State<Arc<BookingService>>,
    Path(user_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let bookings = service.list_bookings_for_user(&user, user_id).await?;
    Ok(Json(json!(bookings)))
}

#[axum::debug_handler]
pub async fn list_practice_bookings(
    State(service): State<Arc<BookingService>>,
    Path(practice_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let bookings = service.list_bookings_for_practice(&user, practice_id).await?;
    Ok(Json(json!(bookings)))
}
