// libs/booking-cell/src/lib.rs
//! # Booking Cell
//!
//! The booking state machine and its HTTP surface.
//!
//! ```text
//! Appointment: available -> booked -> {completed, cancelled}
//!                            booked -> available   (cancelled before the slot date)
//! Booking:     confirmed -> {completed, cancelled}
//!              approval:  pending -> {approved, rejected}   (while confirmed)
//! ```
//!
//! ## API Endpoints
//!
//! - `POST /bookings` - Book an available slot (patient)
//! - `GET /bookings/{id}` - Booking details (owner or practice)
//! - `POST /bookings/{id}/approval` - Approve or reject (practice)
//! - `POST /bookings/{id}/cancel` - Cancel (owner or practice)
//! - `POST /bookings/{id}/complete` - Mark completed (practice)
//! - `GET /users/{id}/bookings` - A patient's bookings, newest first
//! - `GET /practices/{id}/bookings` - A practice's bookings

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{ApprovalRequest, BookingError, CancelBookingRequest, CreateBookingRequest};
pub use router::booking_routes;
pub use services::{BookingLifecycle, BookingService};
