use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The persisted record of the logged-in identity and its bearer token.
///
/// Serialized with the `currentUser` / `jwtToken` field names so the stored
/// value stays readable by other clients of the same backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub current_user: CurrentUser,
    pub jwt_token: String,
}

impl SessionContext {
    pub fn new(current_user: CurrentUser, jwt_token: impl Into<String>) -> Self {
        Self {
            current_user,
            jwt_token: jwt_token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.jwt_token
    }
}

/// Profile returned by the login endpoint, kept exactly as the server sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrentUser(Value);

impl Default for CurrentUser {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

impl From<Value> for CurrentUser {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl CurrentUser {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Top-level profile attribute
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn account_field(&self, field: &str) -> Option<&str> {
        self.0.get("account")?.get(field)?.as_str()
    }

    pub fn firstname(&self) -> Option<&str> {
        self.account_field("firstname")
    }

    pub fn email(&self) -> Option<&str> {
        self.account_field("email")
    }

    /// Name to greet the user with, falling back to the email
    pub fn display_name(&self) -> Option<&str> {
        self.firstname().or_else(|| self.email())
    }
}

/// Credentials posted to the authentication endpoint. Never persisted.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
