//! Main SoundCloud API client.

use crate::auth::{Bootstrap, CredentialManager};
use crate::error::{Result, SoundcloudError};
use crate::transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
use crate::types::{
    ApiResponse, AuthState, ClientConfig, ClientOptions, Query, TokenRequest, TokenResponse,
    TOKEN_PATH,
};
use reqwest::Method;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Client for the SoundCloud API.
///
/// Every call carries `client_id` and, once a token has been acquired,
/// `oauth_token` as query parameters. Responses are classified into
/// [`ApiResponse`] or a [`SoundcloudError`].
///
/// # Example
///
/// ```ignore
/// use soundcloud_client::{ClientOptions, SoundcloudClient};
///
/// // Runs the refresh-token grant while building the client
/// let options = ClientOptions::new("client-id")
///     .client_secret("client-secret")
///     .refresh_token("stored-refresh-token");
/// let client = SoundcloudClient::new(options).await?;
///
/// let track = client.resolve("https://soundcloud.com/artist/track").await?;
/// println!("{}", track.text());
/// ```
#[derive(Clone)]
pub struct SoundcloudClient {
    transport: Arc<dyn Transport>,
    credentials: CredentialManager,
    api_base: Url,
    oembed_uri: Url,
}

impl SoundcloudClient {
    /// Create a client with the default configuration and `reqwest` transport.
    ///
    /// Runs whichever grant flow `options` selects before returning.
    pub async fn new(options: ClientOptions) -> Result<Self> {
        Self::with_config(options, ClientConfig::default()).await
    }

    /// Create a client with a custom configuration and the `reqwest` transport.
    pub async fn with_config(options: ClientOptions, config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config).map_err(|e| {
            SoundcloudError::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;
        Self::with_transport(options, config, Arc::new(transport)).await
    }

    /// Create a client on top of an injected transport.
    pub async fn with_transport(
        options: ClientOptions,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let authorize_uri = parse_origin("authorize_uri", &config.authorize_uri)?;
        let credentials = CredentialManager::new(&options, authorize_uri)?;

        let mut client = Self {
            transport,
            credentials,
            api_base: parse_origin("api_base", &config.api_base)?,
            oembed_uri: parse_origin("oembed_uri", &config.oembed_uri)?,
        };

        for step in Bootstrap::plan(&options, config.branch_selection) {
            debug!(step = bootstrap_name(&step), "Running bootstrap step");
            match step {
                Bootstrap::NoAuth => {}
                Bootstrap::AuthorizationCodeFlow { .. } => {
                    client.credentials.begin_authorization_code_flow();
                }
                Bootstrap::RefreshTokenFlow { refresh_token } => {
                    client.authorize_with_refresh_token(&refresh_token).await?;
                }
                Bootstrap::PasswordFlow { username, password } => {
                    client.authorize_with_credentials(&username, &password).await?;
                }
            }
        }

        Ok(client)
    }

    // -------------------------------------------------------------------------
    // Credentials
    // -------------------------------------------------------------------------

    /// Get the credential manager shared by this client.
    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// Get the application's client id.
    pub fn client_id(&self) -> &str {
        self.credentials.client_id()
    }

    /// Get the scope requested by the password and authorization-code grants.
    pub fn scope(&self) -> &str {
        self.credentials.scope()
    }

    /// Get the redirect URI registered for the authorization-code flow.
    pub fn redirect_uri(&self) -> Option<&str> {
        self.credentials.redirect_uri()
    }

    /// Authorize URL built during construction, if any.
    pub fn authorize_url(&self) -> Option<&str> {
        self.credentials.authorize_url()
    }

    /// Build the URL the user must visit to grant access. No I/O.
    pub fn connect(&self) -> String {
        self.credentials.connect()
    }

    /// Get the current access token.
    pub async fn access_token(&self) -> Option<String> {
        self.credentials.access_token().await
    }

    /// Restore a persisted token, or clear it with `None`.
    pub async fn set_access_token(&self, access_token: Option<String>) {
        self.credentials.set_access_token(access_token).await;
    }

    /// Check if the client has an access token.
    pub async fn is_authenticated(&self) -> bool {
        self.credentials.access_token().await.is_some()
    }

    /// Get where the client stands in the authorization flow.
    pub async fn auth_state(&self) -> AuthState {
        self.credentials.auth_state().await
    }

    /// Exchange an authorization code for an access token.
    pub async fn authorize_with_code(&self, code: &str) -> Result<TokenResponse> {
        let request = self.credentials.authorization_code_request(code);
        self.request_token(request).await
    }

    /// Exchange a refresh token for a new access token.
    pub async fn authorize_with_refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let request = self.credentials.refresh_token_request(refresh_token);
        self.request_token(request).await
    }

    /// Exchange a username and password for an access token.
    pub async fn authorize_with_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse> {
        let request = self.credentials.password_request(username, password);
        self.request_token(request).await
    }

    async fn request_token(&self, request: TokenRequest) -> Result<TokenResponse> {
        let response = self.post(TOKEN_PATH, &request, &Query::new()).await?;
        let token: TokenResponse = response
            .deserialize()
            .map_err(|e| SoundcloudError::TokenDecode(e.to_string()))?;

        self.credentials.store_token(&request, &token).await;
        Ok(token)
    }

    // -------------------------------------------------------------------------
    // Verbs
    // -------------------------------------------------------------------------

    /// Send a GET request to `path` on the API host.
    pub async fn get(&self, path: &str, query: &Query) -> Result<ApiResponse> {
        self.request(Method::GET, path, query.clone(), None).await
    }

    /// Send a POST request with `body` encoded as JSON.
    pub async fn post<B>(&self, path: &str, body: &B, query: &Query) -> Result<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let json = encode_body(body)?;
        self.request(Method::POST, path, query.clone(), Some(json))
            .await
    }

    /// Send a PUT request with `body` encoded as JSON.
    pub async fn put<B>(&self, path: &str, body: &B, query: &Query) -> Result<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let json = encode_body(body)?;
        self.request(Method::PUT, path, query.clone(), Some(json))
            .await
    }

    /// Send a DELETE request. No body is sent.
    pub async fn delete(&self, path: &str, query: &Query) -> Result<ApiResponse> {
        self.request(Method::DELETE, path, query.clone(), None)
            .await
    }

    /// Resolve a public SoundCloud URL to its API resource.
    pub async fn resolve(&self, url: &str) -> Result<ApiResponse> {
        let mut query = Query::new();
        query.insert("url".to_string(), url.to_string());
        self.request(Method::GET, "/resolve", query, None).await
    }

    /// Fetch embeddable-player metadata for `url` from the oembed host.
    ///
    /// Entries in `query` override `url` and `format`.
    pub async fn oembed(&self, url: &str, query: &Query) -> Result<ApiResponse> {
        let mut merged = Query::new();
        merged.insert("url".to_string(), url.to_string());
        merged.insert("format".to_string(), "json".to_string());
        merged.extend(query.iter().map(|(k, v)| (k.clone(), v.clone())));

        let oembed_uri = self.oembed_uri.clone();
        let label = oembed_uri.to_string();
        self.dispatch(Method::GET, oembed_uri, &label, merged, None)
            .await
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: Query,
        json: Option<serde_json::Value>,
    ) -> Result<ApiResponse> {
        let url = self.api_url(path)?;
        self.dispatch(method, url, path, query, json).await
    }

    /// Decorate, send and classify a request to an already resolved `url`.
    ///
    /// `path` is only used to label errors and logs.
    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        path: &str,
        mut query: Query,
        json: Option<serde_json::Value>,
    ) -> Result<ApiResponse> {
        // Read the token once; later updates don't affect this call
        query.insert("client_id".to_string(), self.credentials.client_id().to_string());
        if let Some(token) = self.credentials.access_token().await {
            query.insert("oauth_token".to_string(), token);
        }

        debug!(method = %method, url = %url, "Sending request");

        let json = if method == Method::POST || method == Method::PUT {
            json
        } else {
            None
        };
        let request = TransportRequest {
            method: method.clone(),
            url,
            query: query.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            json,
        };

        let response = self.transport.send(request).await?;
        debug!(method = %method, path = %path, status = response.status, "Received response");

        classify(&method, path, &query, response)
    }

    /// Join `path` onto the API base. Paths that leave the API origin are refused.
    fn api_url(&self, path: &str) -> Result<Url> {
        let url = self
            .api_base
            .join(path)
            .map_err(|e| SoundcloudError::InvalidPath(format!("{}: {}", path, e)))?;
        if url.origin() != self.api_base.origin() {
            return Err(SoundcloudError::InvalidPath(format!(
                "{} is not on the API host",
                path
            )));
        }
        Ok(url)
    }
}

fn classify(
    method: &Method,
    path: &str,
    query: &Query,
    response: TransportResponse,
) -> Result<ApiResponse> {
    let status = response.status;

    if status == 401 {
        return Err(SoundcloudError::AuthorizationRequired);
    }

    if !(200..=399).contains(&status) {
        return Err(SoundcloudError::ApiRequest {
            method: method.to_string(),
            path: path.to_string(),
            query: encode_query(query),
            status,
            body: response.text(),
        });
    }

    let is_json = response
        .content_type()
        .is_some_and(|ct| ct.starts_with("application/json"));
    if is_json && !response.body.is_empty() {
        serde_json::from_slice(&response.body)
            .map(ApiResponse::Json)
            .map_err(|source| SoundcloudError::MalformedResponse {
                method: method.to_string(),
                path: path.to_string(),
                status,
                source,
            })
    } else {
        Ok(ApiResponse::Raw(response.body))
    }
}

fn encode_query(query: &Query) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query.iter())
        .finish()
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value> {
    serde_json::to_value(body).map_err(SoundcloudError::BodyEncode)
}

fn parse_origin(field: &str, value: &str) -> Result<Url> {
    Url::parse(value)
        .map_err(|e| SoundcloudError::Configuration(format!("Invalid {} {:?}: {}", field, value, e)))
}

fn bootstrap_name(step: &Bootstrap) -> &'static str {
    match step {
        Bootstrap::NoAuth => "no_auth",
        Bootstrap::AuthorizationCodeFlow { .. } => "authorization_code",
        Bootstrap::RefreshTokenFlow { .. } => "refresh_token",
        Bootstrap::PasswordFlow { .. } => "password",
    }
}
