use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;

use crate::{Result, SoundclipError};

/// Raw response handed back by a transport
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Convenience constructor for JSON bodies
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures below the HTTP status level
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Generic authenticated-request capability.
///
/// Implementations own authentication; callers only name the method, the
/// endpoint relative to the API base and an optional JSON body. Must be safe
/// to share between concurrent requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> std::result::Result<TransportResponse, TransportError>;
}

/// Transport speaking to the Discord REST API with a bot token
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SoundclipError::Validation(
                "Discord API token is required. Pass --token or set DISCORD_API_KEY".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("soundclip/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SoundclipError::Transient(format!("could not build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", format!("Bot {}", self.token));

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else if e.is_connect() {
                TransportError::Connection(e.to_string())
            } else {
                TransportError::Other(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Other(e.to_string())
            }
        })?;

        Ok(TransportResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_requires_token() {
        let err = HttpTransport::new("https://discord.com/api/v10", "  ", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, SoundclipError::Validation(_)));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let transport =
            HttpTransport::new("https://discord.com/api/v10/", "token", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.base_url, "https://discord.com/api/v10");
    }

    #[test]
    fn test_response_success_range() {
        assert!(TransportResponse::new(204, Vec::new()).is_success());
        assert!(!TransportResponse::new(404, Vec::new()).is_success());
    }
}
