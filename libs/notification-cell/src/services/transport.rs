use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::{MailMessage, TransportError};

/// Outbound mail capability. One call, one attempt.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError>;
}

/// Resend-compatible HTTP mail API client.
pub struct HttpMailTransport {
    client: Client,
    api_key: String,
    base_url: String,
}

impl HttpMailTransport {
    pub fn new(config: &AppConfig) -> Result<Self, TransportError> {
        if !config.is_mail_configured() {
            return Err(TransportError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            api_key: config.mail_api_key.clone(),
            base_url: config.mail_api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    /// POST /emails
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError> {
        let url = format!("{}/emails", self.base_url);
        debug!("Sending '{}' to {:?} via {}", message.subject, message.to, url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&json!({
                "from": message.from,
                "to": message.to,
                "subject": message.subject,
                "html": message.html,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let response_text = response.text().await.unwrap_or_default();
            error!("Mail provider returned {}: {}", status, response_text);
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message: response_text,
            });
        }

        Ok(())
    }
}
