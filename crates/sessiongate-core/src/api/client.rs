//! HTTP client factory.
//!
//! One `reqwest::Client` is built up front with the base endpoint and default
//! headers; every call gets a cheap handle onto it. Deadlines are per request
//! and live in `AbortSignal`, not on the shared client, so one request timing
//! out never touches its siblings.

use std::future::Future;
use std::time::Duration;

use reqwest::{header, Client, RequestBuilder};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::{join_url, Config};

/// Connection establishment timeout.
/// Request deadlines are handled per call by `AbortSignal`.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Builds request handles sharing one connection pool.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ClientFactory {
    client: Client,
    base_url: String,
}

impl ClientFactory {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// A ready-to-use handle with base endpoint and default headers applied
    pub fn new_client(&self) -> HttpClient {
        HttpClient {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
        }
    }

    /// A signal that fires once `timeout` has elapsed from now
    pub fn new_abort_signal(&self, timeout: Duration) -> AbortSignal {
        AbortSignal::timeout(timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }
}

/// Why an in-flight request was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    TimedOut(Duration),
    Cancelled,
}

/// Deadline and/or caller cancellation for a single request.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    deadline: Option<(Instant, Duration)>,
    cancel: Option<CancellationToken>,
}

impl AbortSignal {
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some((Instant::now() + timeout, timeout)),
            cancel: None,
        }
    }

    /// A signal that never fires
    pub fn never() -> Self {
        Self::default()
    }

    /// Also fire when `token` is cancelled
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Resolves when the deadline passes or the token is cancelled,
    /// whichever comes first. Pending forever if neither is set.
    pub async fn fired(&self) -> AbortReason {
        let deadline = async {
            match self.deadline {
                Some((at, after)) => {
                    tokio::time::sleep_until(at).await;
                    after
                }
                None => std::future::pending().await,
            }
        };
        let cancelled = async {
            match self.cancel {
                Some(ref token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            after = deadline => AbortReason::TimedOut(after),
            _ = cancelled => AbortReason::Cancelled,
        }
    }

    /// Drive `fut` to completion unless the signal fires first, in which
    /// case `fut` is dropped (aborting the request).
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, AbortReason> {
        tokio::select! {
            biased;
            reason = self.fired() => Err(reason),
            output = fut => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_urls_use_base() {
        let factory = ClientFactory::new(&Config::with_base_url("http://localhost:9/api")).unwrap();
        let client = factory.new_client();
        assert_eq!(client.url("/auth/login"), "http://localhost:9/api/auth/login");
        assert_eq!(factory.base_url(), "http://localhost:9/api");
    }

    #[tokio::test]
    async fn test_signal_times_out() {
        let signal = AbortSignal::timeout(Duration::from_millis(20));
        let result = signal.run(tokio::time::sleep(Duration::from_secs(5))).await;
        assert_eq!(result, Err(AbortReason::TimedOut(Duration::from_millis(20))));
    }

    #[tokio::test]
    async fn test_signal_lets_fast_work_finish() {
        let signal = AbortSignal::timeout(Duration::from_secs(5));
        assert_eq!(signal.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_signal_cancelled_by_token() {
        let token = CancellationToken::new();
        let signal = AbortSignal::timeout(Duration::from_secs(5)).with_cancel(token.clone());
        token.cancel();
        let result = signal.run(tokio::time::sleep(Duration::from_secs(5))).await;
        assert_eq!(result, Err(AbortReason::Cancelled));
    }

    #[tokio::test]
    async fn test_never_signal_does_not_fire() {
        let signal = AbortSignal::never();
        let result = signal
            .run(async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                "done"
            })
            .await;
        assert_eq!(result, Ok("done"));
    }

    #[tokio::test]
    async fn test_sibling_signals_are_independent() {
        let short = AbortSignal::timeout(Duration::from_millis(10));
        let long = AbortSignal::timeout(Duration::from_secs(5));
        let work = || tokio::time::sleep(Duration::from_millis(100));

        let (a, b) = tokio::join!(short.run(work()), long.run(work()));
        assert!(matches!(a, Err(AbortReason::TimedOut(_))));
        assert!(b.is_ok());
    }
}
