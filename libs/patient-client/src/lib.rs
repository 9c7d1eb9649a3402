//! # Patient Client
//!
//! Client-side pieces of the booking experience: the HTTP gateway, the signed-in
//! session context, the booking wizard and the approval status poller.

pub mod client;
pub mod error;
pub mod flow;
pub mod gateway;
pub mod models;
pub mod poller;
pub mod session;

pub use client::BookingApiClient;
pub use error::ClientError;
pub use flow::{BookingDraft, BookingFlow, DraftUpdate};
pub use gateway::BookingGateway;
pub use models::{BookingSubmission, CreatedBooking, Credentials, LoginSession};
pub use poller::{ApprovalChange, ApprovalTracker, PollerHandle, StatusPoller};
pub use session::{MemorySessionStore, SessionContext, SessionStore};
