// libs/auth-cell/src/lib.rs
//! # Auth Cell
//!
//! Account registration, login with server-side sessions, email verification
//! and password reset. Tokens are HS256 JWTs carrying the session id.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{AuthError, LoginRequest, LoginResponse, RegisterRequest};
pub use router::auth_routes;
pub use services::{AuthService, PasswordService};
