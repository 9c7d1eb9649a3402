use std::sync::Arc;

use axum::{routing::get, Router};

use auth_cell::{auth_routes, AuthService};
use booking_cell::{booking_routes, BookingService};
use notification_cell::NotificationDispatcher;
use practice_cell::{practice_routes, PracticeDirectoryService};
use shared_config::AppConfig;
use shared_database::BookingStore;

pub fn create_router(
    config: Arc<AppConfig>,
    store: Arc<dyn BookingStore>,
    notifier: Arc<NotificationDispatcher>,
) -> Router {
    let auth_service = Arc::new(AuthService::new(store.clone(), notifier.clone(), config.clone()));
    let practice_service = Arc::new(PracticeDirectoryService::new(store.clone()));
    let booking_service = Arc::new(BookingService::new(store, notifier));

    let api = Router::new()
        .nest("/auth", auth_routes(config.clone(), auth_service))
        .merge(practice_routes(practice_service))
        .merge(booking_routes(config, booking_service));

    Router::new()
        .route("/", get(|| async { "Dentbook API is running!" }))
        .nest("/api", api)
}
