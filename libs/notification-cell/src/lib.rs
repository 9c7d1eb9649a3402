// libs/notification-cell/src/lib.rs
//! # Notification Cell
//!
//! Turns booking and account events into templated emails and hands them to an
//! HTTP mail provider. Delivery is best effort: a missing credential yields
//! `Suppressed`, a transport error or timeout yields `Failed`, and neither is
//! ever surfaced to the caller as an error.

pub mod models;
pub mod services;
pub mod templates;

pub use models::{BookingSummary, MailMessage, NotificationEvent, NotificationOutcome, TransportError};
pub use services::{HttpMailTransport, MailTransport, NotificationDispatcher};
