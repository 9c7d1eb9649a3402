use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use shared_config::AppConfig;

use crate::models::{MailMessage, NotificationEvent, NotificationOutcome, TransportError};
use crate::services::transport::{HttpMailTransport, MailTransport};
use crate::templates::render;

/// Formats events and hands them to the mail transport. Never returns an error:
/// every failure is logged and reported as an outcome.
pub struct NotificationDispatcher {
    transport: Option<Arc<dyn MailTransport>>,
    from: String,
    app_base_url: String,
    timeout: Duration,
}

impl NotificationDispatcher {
    /// Uses the HTTP transport when mail credentials are configured, otherwise
    /// every event is suppressed.
    pub fn new(config: &AppConfig) -> Self {
        let transport: Option<Arc<dyn MailTransport>> = match HttpMailTransport::new(config) {
            Ok(transport) => Some(Arc::new(transport)),
            Err(e) => {
                warn!("Notifications disabled: {}", e);
                None
            }
        };
        Self::build(transport, config)
    }

    pub fn with_transport(transport: Arc<dyn MailTransport>, config: &AppConfig) -> Self {
        Self::build(Some(transport), config)
    }

    pub fn disabled(config: &AppConfig) -> Self {
        Self::build(None, config)
    }

    fn build(transport: Option<Arc<dyn MailTransport>>, config: &AppConfig) -> Self {
        Self {
            transport,
            from: config.mail_from.clone(),
            app_base_url: config.app_base_url.clone(),
            timeout: Duration::from_millis(config.notification_timeout_ms),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    pub fn compose(&self, event: &NotificationEvent) -> MailMessage {
        let rendered = render(event, &self.app_base_url);
        MailMessage {
            from: self.from.clone(),
            to: vec![event.recipient().to_string()],
            subject: rendered.subject,
            html: rendered.html,
        }
    }

    #[instrument(skip(self, event), fields(kind = event.kind()))]
    pub async fn notify(&self, event: NotificationEvent) -> NotificationOutcome {
        let transport = match &self.transport {
            Some(transport) => transport,
            None => {
                warn!("Mail transport not configured, suppressing {}", event.kind());
                return NotificationOutcome::Suppressed;
            }
        };

        let message = self.compose(&event);

        let result = match tokio::time::timeout(self.timeout, transport.send(&message)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout.as_millis() as u64)),
        };

        match result {
            Ok(()) => {
                info!("Delivered {} notification", event.kind());
                NotificationOutcome::Delivered
            }
            Err(e) => {
                warn!("Notification {} failed: {}", event.kind(), e);
                NotificationOutcome::Failed
            }
        }
    }

    /// Run `notify` on its own task so the caller's response is not held up.
    pub fn dispatch_detached(self: &Arc<Self>, event: NotificationEvent) -> JoinHandle<NotificationOutcome> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.notify(event).await })
    }
}
