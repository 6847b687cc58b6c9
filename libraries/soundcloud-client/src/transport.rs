//! HTTP transport used by the client.
//!
//! The client never talks to the network directly: it hands a
//! [`TransportRequest`] to a [`Transport`] and classifies whatever comes
//! back. [`ReqwestTransport`] is the default implementation.

use crate::types::ClientConfig;
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use url::Url;

/// Errors raised below the HTTP status layer.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Server could not be reached (connection refused, timeout)
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure reported by a custom transport
    #[error("Transport failure: {0}")]
    Other(String),
}

/// A fully-decorated outbound request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub query: Vec<(String, String)>,
    /// JSON body, only ever set for POST and PUT
    pub json: Option<serde_json::Value>,
}

/// Status, headers and body of a received response.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    /// Header names are lower-cased
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Look up a header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Get the `Content-Type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends a request and returns status, headers and body.
///
/// Implementations own timeouts, TLS and connection pooling. Non-2xx
/// statuses are not errors at this level.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Build a transport from the timeouts, user agent and TLS settings in `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        if config.accept_invalid_certs {
            warn!("TLS certificate verification is disabled");
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self { http })
    }

    /// Wrap an already configured `reqwest` client.
    pub fn from_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .http
            .request(request.method, request.url)
            .query(&request.query);
        if let Some(json) = &request.json {
            builder = builder.json(json);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                TransportError::Unreachable(e.to_string())
            } else {
                TransportError::Http(e)
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/json; charset=utf-8".to_string(),
        );
        let response = TransportResponse {
            status: 200,
            headers,
            body: b"{}".to_vec(),
        };

        assert_eq!(
            response.header("Content-Type"),
            Some("application/json; charset=utf-8")
        );
        assert_eq!(
            response.content_type(),
            Some("application/json; charset=utf-8")
        );
        assert!(response.header("x-missing").is_none());
    }

    #[test]
    fn test_text_is_lossy() {
        let response = TransportResponse {
            status: 500,
            headers: HashMap::new(),
            body: vec![b'o', b'k', 0xff],
        };

        assert!(response.text().starts_with("ok"));
    }

    #[test]
    fn test_reqwest_transport_builds_with_defaults() {
        assert!(ReqwestTransport::new(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn test_reqwest_transport_builds_without_tls_verification() {
        let config = ClientConfig {
            accept_invalid_certs: true,
            ..ClientConfig::default()
        };
        assert!(ReqwestTransport::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_from_client_sends_through_given_client() {
        let transport = ReqwestTransport::from_client(Client::new());
        let request = TransportRequest {
            method: Method::GET,
            url: Url::parse("http://127.0.0.1:1/me").unwrap(),
            query: vec![("client_id".to_string(), "id".to_string())],
            json: None,
        };

        match transport.send(request).await {
            Err(TransportError::Unreachable(_) | TransportError::Http(_)) => {}
            other => panic!("Expected a transport failure, got: {:?}", other),
        }
    }
}
