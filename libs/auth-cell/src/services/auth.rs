// libs/auth-cell/src/services/auth.rs
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, instrument, warn};

use notification_cell::{NotificationDispatcher, NotificationEvent};
use shared_config::AppConfig;
use shared_database::{BookingStore, StoreError};
use shared_models::auth::{AuthUser, JwtClaims};
use shared_models::entities::{NewSession, NewUser, User, UserType};
use shared_utils::jwt::issue_token;
use shared_utils::validation::{is_valid_email, normalize_email};

use crate::models::{
    AuthError, LoginRequest, LoginResponse, PasswordResetConfirm, RegisterRequest,
};
use crate::services::password::PasswordService;

const TOKEN_LENGTH: usize = 32;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

pub struct AuthService {
    store: Arc<dyn BookingStore>,
    notifier: Arc<NotificationDispatcher>,
    config: Arc<AppConfig>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        notifier: Arc<NotificationDispatcher>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    #[instrument(skip(self, request), fields(user_type = %request.user_type))]
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AuthError> {
        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(AuthError::Validation("A valid email address is required".to_string()));
        }
        PasswordService::validate_password(&request.password).map_err(AuthError::Validation)?;

        match (request.user_type, request.practice_id) {
            (UserType::Dentist, None) => {
                return Err(AuthError::Validation(
                    "Dentist accounts must reference a practice".to_string(),
                ));
            }
            (UserType::Dentist, Some(practice_id)) => {
                if self.store.get_practice(practice_id).await?.is_none() {
                    return Err(AuthError::Validation(format!("Unknown practice {}", practice_id)));
                }
            }
            (UserType::Patient, Some(_)) => {
                return Err(AuthError::Validation(
                    "Patient accounts cannot reference a practice".to_string(),
                ));
            }
            (UserType::Patient, None) => {}
        }

        let password_hash = PasswordService::hash_password(&request.password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let verification_token = PasswordService::generate_token(TOKEN_LENGTH);

        let user = self
            .store
            .insert_user(NewUser {
                email,
                password_hash,
                user_type: request.user_type,
                practice_id: request.practice_id,
                full_name: request.full_name.filter(|n| !n.trim().is_empty()),
                verification_token: Some(verification_token.clone()),
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => AuthError::EmailTaken,
                other => other.into(),
            })?;

        info!("Registered {} account {}", user.user_type, user.id);
        self.notifier.dispatch_detached(NotificationEvent::Welcome {
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            verification_token,
        });

        Ok(user)
    }

    /// Check credentials, open a session row and issue a token bound to it.
    /// Every mismatch yields the same `InvalidCredentials`.
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        let email = normalize_email(&request.email);
        let user = match self.store.find_user_by_email(&email).await? {
            Some(user) => user,
            None => {
                debug!("Login for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let password_ok = PasswordService::verify_password(&request.password, &user.password_hash)
            .unwrap_or_else(|e| {
                warn!("Stored password hash for {} is unreadable: {}", user.id, e);
                false
            });
        if !password_ok || user.user_type != request.user_type {
            warn!("Failed login for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let expires_at = now + Duration::hours(self.config.session_ttl_hours);
        let session = self
            .store
            .insert_session(NewSession {
                id: PasswordService::generate_token(TOKEN_LENGTH),
                user_id: user.id,
                expires_at,
            })
            .await?;

        let claims = JwtClaims {
            sub: user.id.to_string(),
            exp: Some(expires_at.timestamp() as u64),
            email: Some(user.email.clone()),
            role: Some(user.user_type.as_str().to_string()),
            practice_id: user.practice_id.map(|id| id.to_string()),
            sid: Some(session.id.clone()),
            iat: Some(now.timestamp() as u64),
        };
        let token = issue_token(&claims, &self.config.supabase_jwt_secret).map_err(AuthError::Internal)?;

        info!("User {} logged in", user.id);
        Ok(LoginResponse {
            user,
            token,
            expires_at,
        })
    }

    /// Resolve the caller's session back into their account.
    pub async fn restore_session(&self, caller: &AuthUser) -> Result<User, AuthError> {
        let session_id = caller
            .session_id
            .as_deref()
            .ok_or_else(|| AuthError::Unauthorized("Token is not bound to a session".to_string()))?;

        let session = self
            .store
            .get_session(session_id)
            .await?
            .filter(|s| s.user_id == caller.id)
            .ok_or_else(|| AuthError::Unauthorized("Session not found".to_string()))?;

        if session.is_expired(Utc::now()) {
            self.store.delete_session(&session.id).await?;
            return Err(AuthError::Unauthorized("Session expired".to_string()));
        }

        self.store
            .get_user(caller.id)
            .await?
            .ok_or_else(|| AuthError::Unauthorized("Account no longer exists".to_string()))
    }

    pub async fn logout(&self, caller: &AuthUser) -> Result<(), AuthError> {
        if let Some(session_id) = caller.session_id.as_deref() {
            let removed = self.store.delete_session(session_id).await?;
            debug!("Logout for {} removed session: {}", caller.id, removed);
        }
        Ok(())
    }

    pub async fn verify_email(&self, token: &str) -> Result<User, AuthError> {
        let mut user = self
            .store
            .find_user_by_verification_token(token.trim())
            .await?
            .ok_or(AuthError::InvalidToken)?;

        user.verified = true;
        user.verification_token = None;
        let user = self.store.update_user(&user).await?;

        info!("User {} verified their email", user.id);
        Ok(user)
    }

    /// Always succeeds from the caller's point of view so account existence is
    /// not revealed.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let Some(mut user) = self.store.find_user_by_email(&email).await? else {
            debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let reset_token = PasswordService::generate_token(TOKEN_LENGTH);
        user.reset_token = Some(reset_token.clone());
        user.reset_token_expires_at = Some(Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS));
        let user = self.store.update_user(&user).await?;

        self.notifier.dispatch_detached(NotificationEvent::PasswordReset {
            email: user.email.clone(),
            reset_token,
        });
        Ok(())
    }

    pub async fn confirm_password_reset(&self, request: PasswordResetConfirm) -> Result<(), AuthError> {
        PasswordService::validate_password(&request.new_password).map_err(AuthError::Validation)?;

        let mut user = self
            .store
            .find_user_by_reset_token(request.token.trim())
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let expired = user
            .reset_token_expires_at
            .map_or(true, |expires_at| expires_at <= Utc::now());
        if expired {
            return Err(AuthError::InvalidToken);
        }

        user.password_hash = PasswordService::hash_password(&request.new_password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        user.reset_token = None;
        user.reset_token_expires_at = None;
        self.store.update_user(&user).await?;

        info!("Password reset for user {}", user.id);
        Ok(())
    }
}
