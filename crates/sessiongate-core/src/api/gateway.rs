//! Authenticated request gateway.
//!
//! Every outbound call goes through `Gateway`: the bearer token is attached
//! when the stored session is still valid, and every response passes through
//! the same `RejectionPolicy` before the caller sees it. A 401 clears the
//! session, sends the application to the login route and comes back to the
//! caller as `ApiError::SessionExpired`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::client::{AbortSignal, ClientFactory};
use super::error::ApiError;
use super::navigation::Navigator;
use super::page::{Pageable, Response};
use crate::auth::SessionManager;
use crate::config::Config;

/// Empty query string
pub const NO_PARAMS: &[(&str, &str)] = &[];

/// The response interceptor, registered once per gateway.
pub struct RejectionPolicy {
    session: Arc<SessionManager>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
}

impl RejectionPolicy {
    pub fn new(session: Arc<SessionManager>, navigator: Arc<dyn Navigator>, login_route: impl Into<String>) -> Self {
        Self {
            session,
            navigator,
            login_route: login_route.into(),
        }
    }

    /// Let the response through, or invalidate the session on 401.
    pub fn intercept(&self, status: StatusCode) -> Result<(), ApiError> {
        if status != StatusCode::UNAUTHORIZED {
            return Ok(());
        }

        warn!("Backend rejected credentials, invalidating session");
        if let Err(e) = self.session.reset() {
            error!(error = %e, "Failed to clear rejected session");
        }
        self.navigator.redirect_to_login(&self.login_route);
        Err(ApiError::SessionExpired)
    }
}

pub struct Gateway {
    session: Arc<SessionManager>,
    clients: ClientFactory,
    policy: RejectionPolicy,
    default_timeout: Duration,
}

impl Gateway {
    pub fn new(
        config: &Config,
        session: Arc<SessionManager>,
        clients: ClientFactory,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let policy = RejectionPolicy::new(session.clone(), navigator, config.login_route.clone());
        Self {
            session,
            clients,
            policy,
            default_timeout: config.get_timeout(),
        }
    }

    /// GET `path`, aborted with `ApiError::Timeout` once `timeout` elapses
    pub async fn get<T, P>(&self, path: &str, params: &P, timeout: Duration) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let signal = self.clients.new_abort_signal(timeout);
        self.get_with_signal(path, params, &signal).await
    }

    /// GET `path` with the configured default deadline
    pub async fn get_default<T, P>(&self, path: &str, params: &P) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.get(path, params, self.default_timeout).await
    }

    pub async fn get_with_signal<T, P>(&self, path: &str, params: &P, signal: &AbortSignal) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let request = self.clients.new_client().get(path).query(params);
        self.send(path, request, signal).await
    }

    /// POST a JSON body. No deadline beyond the transport's own.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.clients.new_client().post(path).json(body);
        self.send(path, request, &AbortSignal::never()).await
    }

    /// GET a resource that answers with either envelope, folding the page
    /// request into the query. Cancelling `cancel` aborts the request.
    pub async fn get_page<T, P>(
        &self,
        path: &str,
        params: &P,
        pageable: Option<Pageable>,
        cancel: Option<CancellationToken>,
    ) -> Result<Response<T>, ApiError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let mut signal = self.clients.new_abort_signal(self.default_timeout);
        if let Some(token) = cancel {
            signal = signal.with_cancel(token);
        }

        let mut request = self.clients.new_client().get(path).query(params);
        if let Some(pageable) = pageable {
            request = request.query(&pageable);
        }
        self.send(path, request, &signal).await
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
        signal: &AbortSignal,
    ) -> Result<T, ApiError> {
        let request = self.authorize(request);
        let exchange = async {
            let response = request.send().await?;
            self.finish(path, response).await
        };

        match signal.run(exchange).await {
            Ok(result) => result,
            Err(reason) => {
                warn!(path, ?reason, "Request aborted");
                Err(reason.into())
            }
        }
    }

    async fn finish<T: DeserializeOwned>(&self, path: &str, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        debug!(path, status = status.as_u16(), "Response received");
        self.policy.intercept(status)?;

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let bytes = response.bytes().await?;
        let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
        serde_json::from_slice(body)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", path, e)))
    }
}
