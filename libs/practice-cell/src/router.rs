// libs/practice-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::PracticeDirectoryService;

pub fn practice_routes(service: Arc<PracticeDirectoryService>) -> Router {
    // Directory lookups are public; the practice tag gates slot details
    let public_routes = Router::new()
        .route("/treatments", get(handlers::list_treatments))
        .route("/practices", get(handlers::search_practices))
        .route("/practices/access", post(handlers::access_practice))
        .route("/practices/{practice_id}/dentists", get(handlers::list_dentists))
        .route("/appointments/available", get(handlers::list_available));

    Router::new().merge(public_routes).with_state(service)
}
