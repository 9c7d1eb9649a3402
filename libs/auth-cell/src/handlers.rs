// libs/auth-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_utils::json::ValidJson;

use crate::models::{
    LoginRequest, PasswordResetConfirm, PasswordResetRequest, RegisterRequest, VerifyEmailRequest,
};
use crate::services::AuthService;

#[axum::debug_handler]
pub async fn register(
    State(service): State<Arc<AuthService>>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user = service.register(request).await?;
    Ok((StatusCode::CREATED, Json(json!(user))))
}

#[axum::debug_handler]
pub async fn login(
    State(service): State<Arc<AuthService>>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let response = service.login(request).await?;
    Ok(Json(json!(response)))
}

#[axum::debug_handler]
pub async fn get_session(
    State(service): State<Arc<AuthService>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let account = service.restore_session(&user).await?;
    Ok(Json(json!(account)))
}

#[axum::debug_handler]
pub async fn logout(
    State(service): State<Arc<AuthService>>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode, AppError> {
    service.logout(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn verify_email(
    State(service): State<Arc<AuthService>>,
    ValidJson(request): ValidJson<VerifyEmailRequest>,
) -> Result<Json<Value>, AppError> {
    let user = service.verify_email(&request.token).await?;
    Ok(Json(json!(user)))
}

#[axum::debug_handler]
pub async fn request_password_reset(
    State(service): State<Arc<AuthService>>,
    ValidJson(request): ValidJson<PasswordResetRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    service.request_password_reset(&request.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "If the account exists, a reset link has been sent" })),
    ))
}

#[axum::debug_handler]
pub async fn confirm_password_reset(
    State(service): State<Arc<AuthService>>,
    ValidJson(request): ValidJson<PasswordResetConfirm>,
) -> Result<Json<Value>, AppError> {
    service.confirm_password_reset(request).await?;
    Ok(Json(json!({ "success": true })))
}
