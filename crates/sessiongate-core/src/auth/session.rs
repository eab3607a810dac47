use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::context::{CurrentUser, LoginRequest, SessionContext};
use super::error::{AuthError, StoreError};
use super::store::SessionStore;
use super::token;
use crate::api::client::ClientFactory;
use crate::api::page::JsonResponse;
use crate::config::Config;

/// Owns the session lifecycle: login, expiry check, context read, reset.
///
/// Holds no copy of the session itself; every call reads through the store
/// so all holders of the same store agree on the current state.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    clients: ClientFactory,
    login_path: String,
    token_header: String,
}

impl SessionManager {
    pub fn new(config: &Config, store: Arc<dyn SessionStore>, clients: ClientFactory) -> Self {
        Self {
            store,
            clients,
            login_path: config.login_path.clone(),
            token_header: config.token_header.clone(),
        }
    }

    /// Authenticate and persist the resulting session.
    ///
    /// On any failure the store is left exactly as it was.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionContext, AuthError> {
        let request = LoginRequest::new(username, password);
        let client = self.clients.new_client();

        debug!(username, "Sending login request");
        let response = client
            .post(&self.login_path)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Login request failed");
                AuthError::Network(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = AuthError::from_status(status, &body);
            warn!(status = status.as_u16(), error = %err, "Login rejected");
            return Err(err);
        }

        let token = response
            .headers()
            .get(self.token_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AuthError::MissingToken(self.token_header.clone()))?;

        let body: JsonResponse<CurrentUser> = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let context = SessionContext::new(body.data, token);
        self.store.write(&context)?;

        match token::expires_at(context.token()) {
            Ok(exp) => info!(%exp, "Login successful"),
            Err(e) => warn!(error = %e, "Login successful but token expiry is unreadable"),
        }
        Ok(context)
    }

    /// True iff a session is stored and its token expires strictly in the future
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now())
    }

    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        self.store
            .read()
            .map(|context| token::is_valid_at(context.token(), now))
            .unwrap_or(false)
    }

    pub fn get_context(&self) -> Option<SessionContext> {
        self.store.read()
    }

    /// Profile of the logged-in user, for display
    pub fn current_user(&self) -> Option<CurrentUser> {
        self.get_context().map(|context| context.current_user)
    }

    /// Token to attach to outbound requests; `None` unless the session is valid
    pub fn bearer_token(&self) -> Option<String> {
        let context = self.store.read()?;
        if token::is_valid_at(context.token(), Utc::now()) {
            Some(context.jwt_token)
        } else {
            debug!("Stored session is expired or unreadable, sending without credentials");
            None
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let context = self.store.read()?;
        token::expires_at(context.token()).ok()
    }

    /// Minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        let context = self.store.read()?;
        token::time_until_expiry(context.token(), Utc::now())
            .ok()
            .map(|remaining| remaining.num_minutes())
    }

    /// Drop the stored session (logout or backend rejection)
    pub fn reset(&self) -> Result<(), StoreError> {
        self.store.clear()?;
        info!("Session reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemorySessionStore;
    use chrono::Duration;
    use crate::auth::token::unsigned_token;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager(server_uri: &str, store: Arc<dyn SessionStore>) -> SessionManager {
        let config = Config::with_base_url(server_uri);
        let clients = ClientFactory::new(&config).unwrap();
        SessionManager::new(&config, store, clients)
    }

    fn token_in(seconds: i64) -> String {
        unsigned_token(Utc::now().timestamp() + seconds)
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let server = MockServer::start().await;
        let token = token_in(3600);
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({ "username": "a@example.com", "password": "validpass" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("jwt-token", token.as_str())
                    .set_body_json(json!({ "data": { "account": { "firstname": "Jo" } } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let session = manager(&server.uri(), store.clone());

        let context = session.login("a@example.com", "validpass").await.unwrap();
        assert_eq!(context.jwt_token, token);
        assert_eq!(store.read(), Some(context));

        let user = session.get_context().unwrap().current_user;
        assert_eq!(user.firstname(), Some("Jo"));
        assert!(session.is_authenticated());
        assert_eq!(session.bearer_token(), Some(token));
    }

    async fn login_with_profile(profile: serde_json::Value) -> (Result<SessionContext, AuthError>, Arc<dyn SessionStore>) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("jwt-token", token_in(3600).as_str())
                    .set_body_json(json!({ "data": profile })),
            )
            .mount(&server)
            .await;

        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let result = manager(&server.uri(), store.clone())
            .login("a@example.com", "validpass")
            .await;
        (result, store)
    }

    #[tokio::test]
    async fn test_login_accepts_null_account() {
        let profile = json!({ "id": 1, "account": null });
        let (result, store) = login_with_profile(profile.clone()).await;

        let context = result.unwrap();
        assert_eq!(context.current_user.as_value(), &profile);
        assert_eq!(store.read(), Some(context));
    }

    #[tokio::test]
    async fn test_login_profile_without_account_is_stored_as_sent() {
        let profile = json!({ "id": 1, "name": "Jo" });
        let (result, store) = login_with_profile(profile.clone()).await;

        result.unwrap();
        let stored = serde_json::to_value(store.read().unwrap()).unwrap();
        assert_eq!(stored["currentUser"], profile);
    }

    #[tokio::test]
    async fn test_login_replaces_previous_session() {
        let server = MockServer::start().await;
        let token = token_in(3600);
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("jwt-token", token.as_str())
                    .set_body_json(json!({ "data": { "account": { "firstname": "New" } } })),
            )
            .mount(&server)
            .await;

        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let old_user: CurrentUser =
            serde_json::from_value(json!({ "legacy": true, "account": { "firstname": "Old" } })).unwrap();
        store.write(&SessionContext::new(old_user, "old-token")).unwrap();

        let session = manager(&server.uri(), store.clone());
        let context = session.login("a@example.com", "validpass").await.unwrap();

        let stored = store.read().unwrap();
        assert_eq!(stored, context);
        assert_eq!(stored.jwt_token, token);
        assert!(stored.current_user.get("legacy").is_none());
        assert_eq!(stored.current_user.firstname(), Some("New"));
    }

    #[tokio::test]
    async fn test_rejected_login_leaves_store_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })))
            .mount(&server)
            .await;

        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let previous = SessionContext::new(CurrentUser::default(), token_in(60));
        store.write(&previous).unwrap();

        let session = manager(&server.uri(), store.clone());
        let err = session.login("a@example.com", "wrong").await.unwrap_err();

        assert!(err.is_credential_rejection());
        assert_eq!(err.to_string(), "Bad credentials");
        assert_eq!(store.read(), Some(previous));
    }

    #[tokio::test]
    async fn test_login_without_token_header_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .mount(&server)
            .await;

        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let session = manager(&server.uri(), store.clone());
        let err = session.login("a@example.com", "validpass").await.unwrap_err();

        assert!(matches!(err, AuthError::MissingToken(ref h) if h == "jwt-token"));
        assert!(store.read().is_none());
    }

    #[tokio::test]
    async fn test_login_network_failure() {
        // Nothing listens on the discard port
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let session = manager("http://127.0.0.1:9", store.clone());
        let err = session.login("a@example.com", "validpass").await.unwrap_err();

        assert!(matches!(err, AuthError::Network(_)));
        assert!(store.read().is_none());
    }

    #[test]
    fn test_empty_store_is_not_authenticated() {
        let session = manager("http://127.0.0.1:9", Arc::new(MemorySessionStore::new()));
        assert!(!session.is_authenticated());
        assert!(session.get_context().is_none());
        assert!(session.current_user().is_none());
        assert!(session.bearer_token().is_none());
    }

    #[test]
    fn test_expiry_check_against_clock() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let session = manager("http://127.0.0.1:9", store.clone());

        store
            .write(&SessionContext::new(CurrentUser::default(), token_in(-1)))
            .unwrap();
        assert!(!session.is_authenticated());
        // Expired sessions stay put until the backend rejects them
        assert!(session.get_context().is_some());

        store
            .write(&SessionContext::new(CurrentUser::default(), token_in(3600)))
            .unwrap();
        assert!(session.is_authenticated());
        assert!(!session.is_authenticated_at(Utc::now() + Duration::hours(2)));
        assert!(session.minutes_until_expiry().unwrap() >= 59);
    }

    #[test]
    fn test_malformed_token_is_not_authenticated() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        store
            .write(&SessionContext::new(CurrentUser::default(), "garbage"))
            .unwrap();
        let session = manager("http://127.0.0.1:9", store);
        assert!(!session.is_authenticated());
        assert!(session.expires_at().is_none());
        assert!(session.bearer_token().is_none());
    }

    #[test]
    fn test_reset_clears_store() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        store
            .write(&SessionContext::new(CurrentUser::default(), token_in(3600)))
            .unwrap();
        let session = manager("http://127.0.0.1:9", store.clone());

        session.reset().unwrap();
        session.reset().unwrap();
        assert!(store.read().is_none());
        assert!(!session.is_authenticated());
    }
}
