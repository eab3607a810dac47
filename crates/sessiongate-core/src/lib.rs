//! Session lifecycle and authenticated HTTP gateway.
//!
//! A login posts credentials, takes the bearer token from the response
//! header and persists it with the user profile. Outbound requests go
//! through the [`api::Gateway`], which attaches the token while it is still
//! valid and invalidates the session when the backend answers 401.

pub mod api;
pub mod auth;
pub mod config;
pub mod services;

pub use api::{ApiError, Gateway, Navigator};
pub use auth::{AuthError, SessionContext, SessionManager};
pub use config::Config;
pub use services::Services;
