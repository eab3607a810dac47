//! Outbound HTTP for the application.
//!
//! `ClientFactory` hands out request handles and per-request abort signals;
//! `Gateway` wraps them with bearer injection and the single 401 policy.

pub mod client;
pub mod error;
pub mod gateway;
pub mod navigation;
pub mod page;

pub use client::{AbortReason, AbortSignal, ClientFactory, HttpClient};
pub use error::ApiError;
pub use gateway::{Gateway, RejectionPolicy, NO_PARAMS};
pub use navigation::{LogNavigator, Navigator};
pub use page::{JsonResponse, Page, Pageable, Response};
