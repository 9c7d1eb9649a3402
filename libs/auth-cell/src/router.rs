// libs/auth-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::AuthService;

pub fn auth_routes(config: Arc<AppConfig>, service: Arc<AuthService>) -> Router {
    let public_routes = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/verify-email", post(handlers::verify_email))
        .route("/password-reset", post(handlers::request_password_reset))
        .route("/password-reset/confirm", post(handlers::confirm_password_reset));

    let protected_routes = Router::new()
        .route("/session", get(handlers::get_session))
        .route("/logout", post(handlers::logout))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(service)
}
