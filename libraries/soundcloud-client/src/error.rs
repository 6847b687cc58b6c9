//! Error types for the SoundCloud client.

use crate::transport::TransportError;
use thiserror::Error;

/// Errors that can occur when talking to the SoundCloud API.
#[derive(Error, Debug)]
pub enum SoundcloudError {
    /// Client could not be constructed (missing `client_id`, bad origin, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Server answered with HTTP 401; re-run a token acquisition and retry
    #[error("You must authorize your application first")]
    AuthorizationRequired,

    /// Server answered with a status outside the 2xx/3xx range
    #[error("The request \"{method} {path}?{query}\" returned with HTTP status code {status}: {body}")]
    ApiRequest {
        method: String,
        path: String,
        query: String,
        status: u16,
        body: String,
    },

    /// Body was declared as JSON but could not be parsed
    #[error("The request \"{method} {path}\" returned malformed JSON (status {status}): {source}")]
    MalformedResponse {
        method: String,
        path: String,
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// Request path does not resolve to the API host; nothing was sent
    #[error("Invalid request path: {0}")]
    InvalidPath(String),

    /// Network or protocol failure below the HTTP status layer
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// POST/PUT body could not be encoded as JSON; nothing was sent
    #[error("Failed to encode request body: {0}")]
    BodyEncode(#[source] serde_json::Error),

    /// Token endpoint answered but not with a usable token payload
    #[error("Failed to decode token response: {0}")]
    TokenDecode(String),
}

impl SoundcloudError {
    /// True for API-level failures, including malformed JSON bodies.
    pub fn is_api_request_error(&self) -> bool {
        matches!(
            self,
            SoundcloudError::ApiRequest { .. } | SoundcloudError::MalformedResponse { .. }
        )
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            SoundcloudError::AuthorizationRequired => Some(401),
            SoundcloudError::ApiRequest { status, .. }
            | SoundcloudError::MalformedResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for SoundCloud client operations.
pub type Result<T> = std::result::Result<T, SoundcloudError>;
