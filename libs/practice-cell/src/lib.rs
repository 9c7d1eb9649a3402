// libs/practice-cell/src/lib.rs
//! # Practice Cell
//!
//! Treatment catalog, practice search with accessibility filters, tag-gated
//! practice access and the `listAvailable` slot query.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{AvailableSlot, AvailableSlotsQuery, PracticeAccess, PracticeError, PracticeSearchQuery};
pub use router::practice_routes;
pub use services::PracticeDirectoryService;
