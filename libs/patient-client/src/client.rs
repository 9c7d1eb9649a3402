use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::entities::{Booking, User};

use crate::error::ClientError;
use crate::gateway::BookingGateway;
use crate::models::{BookingSubmission, CreatedBooking, Credentials, ErrorBody, LoginSession};

/// HTTP implementation of [`BookingGateway`] against the `/api` surface.
pub struct BookingApiClient {
    client: Client,
    base_url: String,
}

impl BookingApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}/api{}", self.base_url, path);
        debug!("{} {}", method, url);

        let builder = self.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await?;
        let (message, code) = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => (body.error, body.code),
            Err(_) => (text, None),
        };
        warn!("API error ({}): {}", status, message);

        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let response = Self::check(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl BookingGateway for BookingApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<LoginSession, ClientError> {
        let response = self
            .request(Method::POST, "/auth/login", None)
            .json(credentials)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn restore_session(&self, token: &str) -> Result<User, ClientError> {
        let response = self.request(Method::GET, "/auth/session", Some(token)).send().await?;
        Self::decode(response).await
    }

    async fn logout(&self, token: &str) -> Result<(), ClientError> {
        let response = self.request(Method::POST, "/auth/logout", Some(token)).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn create_booking(
        &self,
        token: &str,
        submission: &BookingSubmission,
    ) -> Result<CreatedBooking, ClientError> {
        let response = self
            .request(Method::POST, "/bookings", Some(token))
            .json(submission)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn list_bookings_for_user(&self, token: &str, user_id: Uuid) -> Result<Vec<Booking>, ClientError> {
        let path = format!("/users/{}/bookings", user_id);
        let response = self.request(Method::GET, &path, Some(token)).send().await?;
        Self::decode(response).await
    }
}
