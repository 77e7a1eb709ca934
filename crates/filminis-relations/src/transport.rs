//! REST transport for the catalog API.
//!
//! The engine talks to the backend only through [`Transport`], so tests and
//! alternative clients can stand in for [`HttpTransport`].

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::config::{CatalogConfig, ConfigError};

// ============================================================================
// Transport Interface
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },
    #[error("{message} (status {status})")]
    Status { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Unauthorized { .. } => Some(401),
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Request/response client for the catalog API.
///
/// Implementations return the parsed JSON body (`Value::Null` when the body is
/// empty or not JSON) and map every non-2xx answer to a [`TransportError`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError>;
}

/// Human-readable message for a failed response: the body's `error` field when
/// present, otherwise `HTTP {status}`.
pub fn error_message(status: u16, body: &Value) -> String {
    body.get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}

/// Parses a response body leniently: empty or non-JSON text becomes `Null`.
pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or(Value::Null)
}

// ============================================================================
// HTTP Transport
// ============================================================================

/// [`Transport`] over HTTP with an optional bearer token.
///
/// The token is session state owned by the transport; a 401 answer clears it.
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    token: RwLock<Option<String>>,
}

impl HttpTransport {
    pub fn new(config: &CatalogConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::Invalid(format!("base_url `{}`: {e}", config.base_url)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            token: RwLock::new(config.token.clone()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    pub fn clear_token(&self) {
        self.set_token(None);
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            path
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let url = self.url_for(path);
        let mut request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };

        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").json(body);
        }
        if let Some(token) = self.token() {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        tracing::debug!(%method, path, "catalog request");

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let data = parse_body(&text);

        if status == StatusCode::UNAUTHORIZED {
            self.clear_token();
            let message = data
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Session expired")
                .to_string();
            return Err(TransportError::Unauthorized { message });
        }

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &data),
            });
        }

        Ok(data)
    }
}
