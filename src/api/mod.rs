//! Conversion backend client
//!
//! The controller only talks to [`ConvertBackend`]; [`HttpBackend`] is the
//! real implementation, posting JSON to `{server}/api/convert`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Path of the conversion endpoint, relative to the server base URL
pub const CONVERT_PATH: &str = "/api/convert";

/// Shown for any failure to reach the backend or a non-success status
pub const COMMUNICATION_ERROR: &str = "There was a problem communicating with the server.";

/// Body of a conversion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub text: String,
    pub target: String,
}

#[derive(Debug, Deserialize)]
struct ConversionResponse {
    converted: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("{}", COMMUNICATION_ERROR)]
    Transport(String),

    #[error("{}", COMMUNICATION_ERROR)]
    Status(u16),

    #[error("Unexpected response from server: {0}")]
    Decode(String),
}

impl ConvertError {
    /// Underlying cause for logs; Display stays generic for the user
    pub fn detail(&self) -> String {
        match self {
            ConvertError::Transport(cause) => cause.clone(),
            ConvertError::Status(code) => format!("HTTP {}", code),
            ConvertError::Decode(cause) => cause.clone(),
        }
    }
}

#[async_trait]
pub trait ConvertBackend: Send + Sync {
    /// Convert `request.text` for `request.target`, returning the rewritten text
    async fn convert(&self, request: &ConversionRequest) -> Result<String, ConvertError>;
}

/// Result of checking the backend with `GET /api/convert`
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub struct HttpBackend {
    client: Client,
    endpoint: Url,
}

impl HttpBackend {
    /// Build a backend for `server` (a base URL such as `http://127.0.0.1:5000`)
    pub fn new(server: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let endpoint = Self::endpoint_for(server)?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self { client, endpoint })
    }

    fn endpoint_for(server: &str) -> anyhow::Result<Url> {
        let base = format!("{}{}", server.trim_end_matches('/'), CONVERT_PATH);
        Url::parse(&base).map_err(|e| anyhow::anyhow!("Invalid server URL '{}': {}", server, e))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Check whether the backend answers on the convert endpoint
    pub async fn health(&self) -> HealthStatus {
        match self.client.get(self.endpoint.clone()).send().await {
            Ok(response) => {
                let status = response.status();
                let message = response
                    .json::<serde_json::Value>()
                    .await
                    .ok()
                    .and_then(|body| {
                        body.get("message")
                            .or_else(|| body.get("status"))
                            .and_then(|v| v.as_str())
                            .map(str::to_string)
                    });
                HealthStatus {
                    reachable: status.is_success(),
                    status: Some(status.as_u16()),
                    message,
                }
            }
            Err(e) => HealthStatus {
                reachable: false,
                status: None,
                message: Some(e.to_string()),
            },
        }
    }
}

#[async_trait]
impl ConvertBackend for HttpBackend {
    async fn convert(&self, request: &ConversionRequest) -> Result<String, ConvertError> {
        tracing::debug!(endpoint = %self.endpoint, audience = %request.target, "posting conversion");

        // `.json()` sets Content-Type: application/json
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Conversion request failed: {}", e);
                ConvertError::Transport(e.to_string())
            })?;

        let status: StatusCode = response.status();
        if !status.is_success() {
            tracing::warn!("Backend answered {}", status);
            return Err(ConvertError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ConvertError::Transport(e.to_string()))?;

        let parsed: ConversionResponse = serde_json::from_slice(&body)
            .map_err(|e| ConvertError::Decode(e.to_string()))?;

        Ok(parsed.converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response and hand back the raw request text
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];

            // Read headers, then as much body as Content-Length promises
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let content_length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if raw.len() >= split + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn request() -> ConversionRequest {
        ConversionRequest {
            text: "send me the report".to_string(),
            target: "Upward".to_string(),
        }
    }

    #[tokio::test]
    async fn test_convert_success_posts_json() {
        let (server, handle) = serve_once("200 OK", r#"{"original":"x","converted":"Could you send the report?"}"#).await;
        let backend = HttpBackend::new(&server, None).unwrap();

        let converted = backend.convert(&request()).await.unwrap();
        assert_eq!(converted, "Could you send the report?");

        let raw = handle.await.unwrap();
        let lower = raw.to_ascii_lowercase();
        assert!(raw.starts_with("POST /api/convert HTTP/1.1"));
        assert!(lower.contains("content-type: application/json"));

        let body = &raw[raw.find("\r\n\r\n").unwrap() + 4..];
        let sent: ConversionRequest = serde_json::from_str(body).unwrap();
        assert_eq!(sent, request());
    }

    #[tokio::test]
    async fn test_non_success_status_is_generic_failure() {
        let (server, _handle) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let backend = HttpBackend::new(&server, None).unwrap();

        let err = backend.convert(&request()).await.unwrap_err();
        assert_eq!(err, ConvertError::Status(500));
        assert_eq!(err.to_string(), COMMUNICATION_ERROR);
    }

    #[tokio::test]
    async fn test_missing_converted_field_is_decode_error() {
        let (server, _handle) = serve_once("200 OK", r#"{"status":"ok"}"#).await;
        let backend = HttpBackend::new(&server, None).unwrap();

        let err = backend.convert(&request()).await.unwrap_err();
        assert!(matches!(err, ConvertError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::new(&format!("http://{}", addr), None).unwrap();
        let err = backend.convert(&request()).await.unwrap_err();
        assert!(matches!(err, ConvertError::Transport(_)));
        assert_eq!(err.to_string(), COMMUNICATION_ERROR);
    }

    #[tokio::test]
    async fn test_health_reads_status_message() {
        let (server, _handle) = serve_once("200 OK", r#"{"status":"ok","message":"BizTone API is running."}"#).await;
        let backend = HttpBackend::new(&server, None).unwrap();

        let health = backend.health().await;
        assert!(health.reachable);
        assert_eq!(health.status, Some(200));
        assert_eq!(health.message.as_deref(), Some("BizTone API is running."));
    }

    #[test]
    fn test_endpoint_joins_path() {
        let backend = HttpBackend::new("http://localhost:5000/", None).unwrap();
        assert_eq!(backend.endpoint().as_str(), "http://localhost:5000/api/convert");

        assert!(HttpBackend::new("not a url", None).is_err());
    }
}
