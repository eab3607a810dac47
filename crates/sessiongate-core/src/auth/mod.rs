//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionContext`: the persisted identity plus bearer token
//! - `SessionStore`: durable storage for it (file, keychain, memory)
//! - `SessionManager`: login, expiry check, context read, reset
//!
//! Token validity comes from the token's own `exp` claim and is checked
//! against the clock on every use.

pub mod context;
pub mod error;
pub mod session;
pub mod store;
pub mod token;

pub use context::{CurrentUser, LoginRequest, SessionContext};
pub use error::{AuthError, StoreError, TokenError};
pub use session::SessionManager;
pub use store::{open_store, FileSessionStore, KeyringSessionStore, MemorySessionStore, SessionStore};
