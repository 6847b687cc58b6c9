//! Types for SoundCloud client configuration, requests and responses.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main API origin.
pub const API_BASE: &str = "https://api.soundcloud.com/";
/// Oembed endpoint, served from the public site rather than the API host.
pub const OEMBED_URI: &str = "https://soundcloud.com/oembed";
/// Browser redirect target for the authorization-code flow.
pub const AUTHORIZE_URI: &str = "https://soundcloud.com/connect";
/// Token endpoint, relative to [`API_BASE`].
pub const TOKEN_PATH: &str = "/oauth2/token";
/// Scope requested when none is given.
pub const DEFAULT_SCOPE: &str = "non-expiring";

/// Query parameters of a single call.
///
/// Ordered so that error messages render the same query string every time.
pub type Query = BTreeMap<String, String>;

// =============================================================================
// Configuration
// =============================================================================

/// How construction picks grant flows from the provided options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchSelection {
    /// Building the authorize URL does not stop a refresh-token or password
    /// flow from also running.
    #[default]
    Sequential,
    /// Only the first matching flow runs.
    Exclusive,
}

/// Transport and endpoint settings for a client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_oembed_uri")]
    pub oembed_uri: String,

    #[serde(default = "default_authorize_uri")]
    pub authorize_uri: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Skip TLS certificate verification. Only for tests and local development.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    #[serde(default)]
    pub branch_selection: BranchSelection,
}

fn default_api_base() -> String {
    API_BASE.to_string()
}

fn default_oembed_uri() -> String {
    OEMBED_URI.to_string()
}

fn default_authorize_uri() -> String {
    AUTHORIZE_URI.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("SoundcloudClient/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            oembed_uri: default_oembed_uri(),
            authorize_uri: default_authorize_uri(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
            accept_invalid_certs: false,
            branch_selection: BranchSelection::default(),
        }
    }
}

impl ClientConfig {
    /// Point every endpoint at a single origin (e.g. a local mock server).
    pub fn with_origin(origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        Self {
            api_base: format!("{}/", origin),
            oembed_uri: format!("{}/oembed", origin),
            authorize_uri: format!("{}/connect", origin),
            ..Self::default()
        }
    }
}

// =============================================================================
// Construction Options
// =============================================================================

/// Identity and credentials handed to the client at construction.
///
/// Which fields are set decides which grant flow, if any, runs while the
/// client is built.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub scope: Option<String>,
}

impl ClientOptions {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    #[must_use]
    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    #[must_use]
    pub fn access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    #[must_use]
    pub fn refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Username and password for the password grant.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

/// Where the client stands in the authorization flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// Authorize URL was built; waiting for the user to come back with a code
    AwaitingCode,
    Authenticated,
}

// =============================================================================
// Token Exchange Types
// =============================================================================

/// Body of a `POST /oauth2/token` request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "grant_type", rename_all = "snake_case")]
pub enum TokenRequest {
    AuthorizationCode {
        client_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_secret: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        redirect_uri: Option<String>,
        code: String,
    },
    RefreshToken {
        client_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_secret: Option<String>,
        refresh_token: String,
    },
    Password {
        client_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_secret: Option<String>,
        scope: String,
        username: String,
        password: String,
    },
}

impl TokenRequest {
    pub fn grant_type(&self) -> &'static str {
        match self {
            TokenRequest::AuthorizationCode { .. } => "authorization_code",
            TokenRequest::RefreshToken { .. } => "refresh_token",
            TokenRequest::Password { .. } => "password",
        }
    }
}

/// Successful answer from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Token validity in seconds; absent for non-expiring tokens
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// Decoded body of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Body served as `application/json`
    Json(serde_json::Value),
    /// Any other body, untouched
    Raw(Vec<u8>),
}

impl ApiResponse {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ApiResponse::Json(value) => Some(value),
            ApiResponse::Raw(_) => None,
        }
    }

    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            ApiResponse::Json(value) => Some(value),
            ApiResponse::Raw(_) => None,
        }
    }

    /// Decode a JSON body into a typed value.
    ///
    /// Raw bodies are parsed as JSON text, so an empty raw body fails.
    pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        match self {
            ApiResponse::Json(value) => T::deserialize(value),
            ApiResponse::Raw(bytes) => serde_json::from_slice(bytes),
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            ApiResponse::Raw(bytes) => Some(bytes),
            ApiResponse::Json(_) => None,
        }
    }

    /// Raw body as text, or the JSON value re-serialized.
    pub fn text(&self) -> String {
        match self {
            ApiResponse::Json(value) => value.to_string(),
            ApiResponse::Raw(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ApiResponse::Raw(bytes) if bytes.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base, "https://api.soundcloud.com/");
        assert_eq!(config.oembed_uri, "https://soundcloud.com/oembed");
        assert_eq!(config.authorize_uri, "https://soundcloud.com/connect");
        assert!(!config.accept_invalid_certs);
        assert_eq!(config.branch_selection, BranchSelection::Sequential);
        assert!(config.user_agent.starts_with("SoundcloudClient/"));
    }

    #[test]
    fn test_config_deserializes_with_partial_fields() {
        let config: ClientConfig = serde_json::from_value(json!({
            "timeout_secs": 5,
            "branch_selection": "exclusive"
        }))
        .unwrap();

        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.api_base, API_BASE);
        assert_eq!(config.branch_selection, BranchSelection::Exclusive);
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn test_with_origin() {
        let config = ClientConfig::with_origin("http://127.0.0.1:8080/");
        assert_eq!(config.api_base, "http://127.0.0.1:8080/");
        assert_eq!(config.oembed_uri, "http://127.0.0.1:8080/oembed");
        assert_eq!(config.authorize_uri, "http://127.0.0.1:8080/connect");
    }

    #[test]
    fn test_options_builder() {
        let options = ClientOptions::new("id")
            .client_secret("secret")
            .credentials("user", "pass")
            .scope("*");

        assert_eq!(options.client_id.as_deref(), Some("id"));
        assert_eq!(options.client_secret.as_deref(), Some("secret"));
        assert_eq!(options.username.as_deref(), Some("user"));
        assert_eq!(options.password.as_deref(), Some("pass"));
        assert_eq!(options.scope.as_deref(), Some("*"));
        assert!(options.refresh_token.is_none());
        assert!(ClientOptions::default().client_id.is_none());
    }

    #[test]
    fn test_token_request_carries_grant_type() {
        let request = TokenRequest::RefreshToken {
            client_id: "id".into(),
            client_secret: Some("secret".into()),
            refresh_token: "r".into(),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "grant_type": "refresh_token",
                "client_id": "id",
                "client_secret": "secret",
                "refresh_token": "r"
            })
        );
        assert_eq!(request.grant_type(), "refresh_token");
    }

    #[test]
    fn test_token_request_skips_missing_secret() {
        let request = TokenRequest::AuthorizationCode {
            client_id: "id".into(),
            client_secret: None,
            redirect_uri: Some("https://app/cb".into()),
            code: "c".into(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["grant_type"], "authorization_code");
        assert!(value.get("client_secret").is_none());
        assert_eq!(value["redirect_uri"], "https://app/cb");
    }

    #[test]
    fn test_token_response_requires_access_token() {
        let ok: TokenResponse = serde_json::from_value(json!({"access_token": "XYZ"})).unwrap();
        assert_eq!(ok.access_token, "XYZ");
        assert!(ok.refresh_token.is_none());

        assert!(serde_json::from_value::<TokenResponse>(json!({"token": "XYZ"})).is_err());
    }

    #[test]
    fn test_api_response_helpers() {
        let json = ApiResponse::Json(json!({"id": 1}));
        assert_eq!(json.as_json().unwrap()["id"], 1);
        assert!(json.bytes().is_none());
        assert!(!json.is_empty());

        let raw = ApiResponse::Raw(Vec::new());
        assert!(raw.is_empty());
        assert!(raw.as_json().is_none());
        assert_eq!(raw.text(), "");

        #[derive(Deserialize)]
        struct Track {
            id: u64,
        }
        let track: Track = json.deserialize().unwrap();
        assert_eq!(track.id, 1);
    }
}
