//! Client identity, the shared access-token cell, and grant-flow selection.

use crate::error::{Result, SoundcloudError};
use crate::types::{
    AuthState, BranchSelection, ClientOptions, TokenRequest, TokenResponse, DEFAULT_SCOPE,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

/// A grant flow picked from the construction options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bootstrap {
    /// Nothing to do; calls go out with `client_id` only (or a supplied token)
    NoAuth,
    /// Build the authorize URL for the user to visit. No network call.
    AuthorizationCodeFlow { redirect_uri: String },
    RefreshTokenFlow { refresh_token: String },
    PasswordFlow { username: String, password: String },
}

impl Bootstrap {
    /// Pick the flows to run for `options`, in execution order.
    ///
    /// Priority is authorization code, then refresh token, then password.
    /// With [`BranchSelection::Sequential`] the authorization-code branch
    /// does not exclude the token flows that follow it.
    pub fn plan(options: &ClientOptions, selection: BranchSelection) -> Vec<Bootstrap> {
        let mut steps = Vec::new();

        if let Some(redirect_uri) = &options.redirect_uri {
            steps.push(Bootstrap::AuthorizationCodeFlow {
                redirect_uri: redirect_uri.clone(),
            });
            if selection == BranchSelection::Exclusive {
                return steps;
            }
        }

        if options.client_secret.is_some() {
            if let Some(refresh_token) = &options.refresh_token {
                steps.push(Bootstrap::RefreshTokenFlow {
                    refresh_token: refresh_token.clone(),
                });
            } else if let (Some(username), Some(password)) = (&options.username, &options.password)
            {
                steps.push(Bootstrap::PasswordFlow {
                    username: username.clone(),
                    password: password.clone(),
                });
            }
        }

        if steps.is_empty() {
            steps.push(Bootstrap::NoAuth);
        }
        steps
    }
}

/// Mutable half of the client state. Always replaced as a whole.
#[derive(Debug, Clone, Default)]
pub(crate) struct Credential {
    pub(crate) access_token: Option<String>,
}

/// Holds the client identity and the current access token.
///
/// Cloning shares the token cell: a token stored through one clone is seen
/// by every other.
#[derive(Debug, Clone)]
pub struct CredentialManager {
    client_id: String,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    scope: String,
    authorize_uri: Url,
    authorize_url: Option<String>,
    credential: Arc<RwLock<Credential>>,
}

impl CredentialManager {
    /// Copy identity fields out of `options`.
    ///
    /// Fails if `client_id` is missing. Does not run any grant flow.
    pub fn new(options: &ClientOptions, authorize_uri: Url) -> Result<Self> {
        let client_id = options.client_id.clone().ok_or_else(|| {
            SoundcloudError::Configuration("At least a client_id must be provided".into())
        })?;

        Ok(Self {
            client_id,
            client_secret: options.client_secret.clone(),
            redirect_uri: options.redirect_uri.clone(),
            scope: options
                .scope
                .clone()
                .unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            authorize_uri,
            authorize_url: None,
            credential: Arc::new(RwLock::new(Credential {
                access_token: options.access_token.clone(),
            })),
        })
    }

    /// Get the application's client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Get the client secret, if one was provided.
    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    /// Get the redirect URI, if one was provided.
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    /// Get the requested scope (`non-expiring` unless overridden).
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Authorize URL built during construction, if a redirect URI was given.
    pub fn authorize_url(&self) -> Option<&str> {
        self.authorize_url.as_deref()
    }

    /// Build the URL the user must visit to grant access.
    ///
    /// Pure: no I/O, no state change. `redirect_uri` is left out when unset.
    pub fn connect(&self) -> String {
        let mut url = self.authorize_uri.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("response_type", "code");
            pairs.append_pair("client_id", &self.client_id);
            if let Some(redirect_uri) = &self.redirect_uri {
                pairs.append_pair("redirect_uri", redirect_uri);
            }
            pairs.append_pair("scope", &self.scope);
        }
        debug!(client_id = %self.client_id, "Built authorize URL");
        url.into()
    }

    /// Build and retain the authorize URL.
    pub(crate) fn begin_authorization_code_flow(&mut self) -> String {
        let url = self.connect();
        self.authorize_url = Some(url.clone());
        url
    }

    /// Token request for the authorization-code grant.
    pub fn authorization_code_request(&self, code: &str) -> TokenRequest {
        TokenRequest::AuthorizationCode {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
            code: code.to_string(),
        }
    }

    /// Token request for the refresh-token grant.
    pub fn refresh_token_request(&self, refresh_token: &str) -> TokenRequest {
        TokenRequest::RefreshToken {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            refresh_token: refresh_token.to_string(),
        }
    }

    /// Token request for the password grant.
    pub fn password_request(&self, username: &str, password: &str) -> TokenRequest {
        TokenRequest::Password {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            scope: self.scope.clone(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Current access token, read once.
    pub async fn access_token(&self) -> Option<String> {
        self.credential.read().await.access_token.clone()
    }

    /// Replace the stored token. Last writer wins.
    pub async fn set_access_token(&self, access_token: Option<String>) {
        *self.credential.write().await = Credential { access_token };
    }

    pub(crate) async fn store_token(&self, request: &TokenRequest, token: &TokenResponse) {
        self.set_access_token(Some(token.access_token.clone())).await;
        info!(grant_type = request.grant_type(), "Stored new access token");
    }

    /// Derive the authorization state from the stored token and authorize URL.
    pub async fn auth_state(&self) -> AuthState {
        if self.credential.read().await.access_token.is_some() {
            AuthState::Authenticated
        } else if self.authorize_url.is_some() {
            AuthState::AwaitingCode
        } else {
            AuthState::Unauthenticated
        }
    }
}
