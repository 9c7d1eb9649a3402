// libs/booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::BookingService;

pub fn booking_routes(config: Arc<AppConfig>, service: Arc<BookingService>) -> Router {
    // Every booking operation requires authentication
    let protected_routes = Router::new()
        .route("/bookings", post(handlers::create_booking))
        .route("/bookings/{booking_id}", get(handlers::get_booking))
        .route("/bookings/{booking_id}/approval", post(handlers::set_approval_status))
        .route("/bookings/{booking_id}/cancel", post(handlers::cancel_booking))
        .route("/bookings/{booking_id}/complete", post(handlers::complete_booking))
        .route("/users/{user_id}/bookings", get(handlers::list_user_bookings))
        .route("/practices/{practice_id}/bookings", get(handlers::list_practice_bookings))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(service)
}
