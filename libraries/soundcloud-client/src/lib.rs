//! SoundCloud API Client
//!
//! HTTP client library for the SoundCloud API.
//!
//! # Features
//!
//! - **Authorization**: authorize URL, authorization-code, refresh-token and
//!   password grants, picked automatically from the construction options
//! - **Generic calls**: GET/POST/PUT/DELETE with `client_id` and
//!   `oauth_token` attached to every request
//! - **Shortcuts**: `resolve` and `oembed`
//! - **Pluggable transport**: `reqwest` by default, TLS verification on
//!
//! # Example
//!
//! ```ignore
//! use soundcloud_client::{ClientOptions, Query, SoundcloudClient, SoundcloudError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Password grant runs while the client is built
//!     let options = ClientOptions::new("client-id")
//!         .client_secret("client-secret")
//!         .credentials("user", "password");
//!     let client = SoundcloudClient::new(options).await?;
//!
//!     match client.get("/me", &Query::new()).await {
//!         Ok(me) => println!("{}", me.text()),
//!         Err(SoundcloudError::AuthorizationRequired) => {
//!             // token expired: run a grant again, then retry
//!         }
//!         Err(e) => return Err(e.into()),
//!     }
//!
//!     Ok(())
//! }
//! ```

mod auth;
mod client;
mod error;
mod transport;
mod types;

pub use auth::{Bootstrap, CredentialManager};
pub use client::SoundcloudClient;
pub use error::{Result, SoundcloudError};
pub use transport::{
    ReqwestTransport, Transport, TransportError, TransportRequest, TransportResponse,
};
pub use types::{
    ApiResponse, AuthState, BranchSelection, ClientConfig, ClientOptions, Query, TokenRequest,
    TokenResponse, API_BASE, AUTHORIZE_URI, DEFAULT_SCOPE, OEMBED_URI, TOKEN_PATH,
};

// Re-exported so custom transports can name the method type
pub use reqwest::Method;
