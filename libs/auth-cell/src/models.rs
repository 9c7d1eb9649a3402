// libs/auth-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::entities::{User, UserType};
use shared_models::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub user_type: UserType,
    pub practice_id: Option<Uuid>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub user_type: UserType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetConfirm {
    pub token: String,
    pub new_password: String,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email, password or account type")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Validation(String),

    #[error("Token is invalid or has expired")]
    InvalidToken,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::Unauthorized(_) => AppError::Auth(err.to_string()),
            AuthError::Validation(msg) => AppError::ValidationError(msg),
            AuthError::InvalidToken => AppError::BadRequest(err.to_string()),
            AuthError::EmailTaken => AppError::Conflict(err.to_string()),
            AuthError::Store(StoreError::Duplicate(_)) => {
                AppError::Conflict("An account with this email already exists".to_string())
            }
            AuthError::Store(e) => AppError::Database(e.to_string()),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
