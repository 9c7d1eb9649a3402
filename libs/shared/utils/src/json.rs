use axum::{
    extract::{rejection::JsonRejection, FromRequest, OptionalFromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use shared_models::error::AppError;

/// `Json` body extractor whose rejections render as `VALIDATION_ERROR`.
///
/// As `Option<ValidJson<T>>` a request without a JSON content type yields
/// `None`, so optional bodies may be left out entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

fn reject(rejection: JsonRejection) -> AppError {
    debug!("Rejected request body: {}", rejection.body_text());
    AppError::ValidationError(rejection.body_text())
}

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = <Json<T> as FromRequest<S>>::from_request(req, state)
            .await
            .map_err(reject)?;
        Ok(ValidJson(value))
    }
}

impl<T, S> OptionalFromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let value = <Json<T> as OptionalFromRequest<S>>::from_request(req, state)
            .await
            .map_err(reject)?;
        Ok(value.map(|Json(value)| ValidJson(value)))
    }
}
