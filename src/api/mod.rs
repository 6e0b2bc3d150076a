//! HTTP client for the storefront platform API.
//!
//! Every endpoint speaks JSON wrapped in the common envelope
//! (`models::Envelope`). This module owns:
//! - the error taxonomy (`ApiError`), classified by origin rather than by
//!   exception type: network/timeout (code 0) vs. terminal 4xx vs. server 5xx
//! - the reqwest wrapper (`ApiClient`) applying base URL, bearer token and
//!   the configured per-request deadline to every call
//!
//! The client never retries; retry policy belongs to callers.

pub mod auth;
pub mod products;
pub mod stores;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::models::Envelope;

/// Result alias for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

// ── Error taxonomy ───────────────────────────────────────────────

/// An API call failure, classified by origin.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connectivity failure; possibly transient. Status code 0.
    #[error("network error: {message}")]
    Network { message: String },

    /// Request deadline exceeded. Status code 0, distinguishable from
    /// server-rejected errors.
    #[error("request timed out")]
    Timeout,

    /// Token missing, expired or invalid (401).
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Caller lacks permission for the action (403).
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    /// Resource does not exist (404).
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Request payload rejected by server-side validation (422).
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// Server-side failure (5xx). Never retried automatically.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Any other unexpected HTTP status.
    #[error("unexpected status {status}: {message}")]
    Unexpected { status: u16, message: String },

    /// 2xx response whose envelope was malformed or marked unsuccessful.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },
}

impl ApiError {
    /// Classify a non-2xx HTTP status with the server-provided message.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => Self::Unauthorized { message },
            403 => Self::Forbidden { message },
            404 => Self::NotFound { message },
            422 => Self::Validation { message },
            500..=599 => Self::Server { status, message },
            _ => Self::Unexpected { status, message },
        }
    }

    /// HTTP-status-like code; 0 for network/timeout classifications.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Network { .. } | Self::Timeout => 0,
            Self::Unauthorized { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Validation { .. } => 422,
            Self::Server { status, .. } | Self::Unexpected { status, .. } => *status,
            Self::InvalidResponse { .. } => 500,
        }
    }

    /// Whether the failure class is possibly transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout)
    }

    /// Message suitable for direct user display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { .. } | Self::Timeout => {
                "Connection error. Check your internet and try again.".into()
            }
            Self::Unauthorized { .. } => "Session expired. Please log in again.".into(),
            Self::Forbidden { .. } => "You do not have permission for this action.".into(),
            Self::NotFound { .. } => "Resource not found.".into(),
            Self::Validation { message } => {
                if message.is_empty() {
                    "Invalid data. Check the form and try again.".into()
                } else {
                    message.clone()
                }
            }
            Self::Server { .. } | Self::Unexpected { .. } | Self::InvalidResponse { .. } => {
                "Unexpected error. Try again later.".into()
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::InvalidResponse {
                message: err.to_string(),
            }
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

// ── Client ───────────────────────────────────────────────────────

/// Typed HTTP client for the platform backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Config,
}

impl ApiClient {
    /// Build a client with the configured base URL and request deadline.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> ApiResult<T> {
        self.send(Method::GET, path, &[], None, token).await
    }

    pub async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: Option<&str>,
    ) -> ApiResult<T> {
        self.send(Method::GET, path, query, None, token).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> ApiResult<T> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::InvalidResponse {
            message: format!("failed to encode request body: {e}"),
        })?;
        self.send(Method::POST, path, &[], Some(body), token).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> ApiResult<T> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::InvalidResponse {
            message: format!("failed to encode request body: {e}"),
        })?;
        self.send(Method::PUT, path, &[], Some(body), token).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> ApiResult<T> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::InvalidResponse {
            message: format!("failed to encode request body: {e}"),
        })?;
        self.send(Method::PATCH, path, &[], Some(body), token).await
    }

    /// DELETE; delete endpoints respond with an envelope carrying no data.
    pub async fn delete(&self, path: &str, token: Option<&str>) -> ApiResult<()> {
        let envelope: Envelope<serde_json::Value> = self
            .send_envelope(Method::DELETE, path, &[], None, token)
            .await?;
        if !envelope.success {
            return Err(ApiError::InvalidResponse {
                message: envelope
                    .message
                    .unwrap_or_else(|| "server reported failure in a 2xx response".into()),
            });
        }
        Ok(())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
        token: Option<&str>,
    ) -> ApiResult<T> {
        let envelope = self.send_envelope(method, path, query, body, token).await?;
        if !envelope.success {
            return Err(ApiError::InvalidResponse {
                message: envelope
                    .message
                    .unwrap_or_else(|| "server reported failure in a 2xx response".into()),
            });
        }
        envelope.data.ok_or_else(|| ApiError::InvalidResponse {
            message: "missing data in response envelope".into(),
        })
    }

    async fn send_envelope<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
        token: Option<&str>,
    ) -> ApiResult<Envelope<T>> {
        let url = self.config.api_url(path);
        tracing::debug!(%method, %url, "api request");

        let mut request = self
            .http
            .request(method, &url)
            .header("Accept", "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            // The error body usually carries a message; fall back to the
            // canonical reason phrase when it does not parse.
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .or_else(|| v.get("error"))
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            tracing::debug!(status = status.as_u16(), %message, "api error response");
            return Err(ApiError::from_status(status.as_u16(), message));
        }

        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn classification_by_status() {
        assert!(matches!(
            ApiError::from_status(401, String::new()),
            ApiError::Unauthorized { .. }
        ));
        assert!(matches!(
            ApiError::from_status(403, String::new()),
            ApiError::Forbidden { .. }
        ));
        assert!(matches!(
            ApiError::from_status(404, String::new()),
            ApiError::NotFound { .. }
        ));
        assert!(matches!(
            ApiError::from_status(422, String::new()),
            ApiError::Validation { .. }
        ));
        assert!(matches!(
            ApiError::from_status(503, String::new()),
            ApiError::Server { status: 503, .. }
        ));
        assert!(matches!(
            ApiError::from_status(418, String::new()),
            ApiError::Unexpected { status: 418, .. }
        ));
    }

    #[test]
    fn network_class_is_code_zero_and_retryable() {
        let err = ApiError::Network {
            message: "refused".into(),
        };
        assert_eq!(err.status_code(), 0);
        assert!(err.is_retryable());
        assert_eq!(ApiError::Timeout.status_code(), 0);
        assert!(ApiError::Timeout.is_retryable());
        assert!(!ApiError::from_status(500, String::new()).is_retryable());
    }

    #[test]
    fn user_messages_follow_classification() {
        assert!(ApiError::Timeout.user_message().contains("Connection"));
        assert!(ApiError::from_status(401, String::new())
            .user_message()
            .contains("log in"));
        assert!(ApiError::from_status(403, String::new())
            .user_message()
            .contains("permission"));
        assert_eq!(
            ApiError::from_status(422, "Price must be positive".into()).user_message(),
            "Price must be positive"
        );
    }

    #[tokio::test]
    async fn error_body_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stores/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "success": false,
                "statusCode": 404,
                "message": "Store not found"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(Config::with_base_url(server.uri())).unwrap();
        let err = client
            .get::<serde_json::Value>("/stores/missing", None)
            .await
            .unwrap_err();
        match err {
            ApiError::NotFound { message } => assert_eq!(message, "Store not found"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsuccessful_envelope_in_2xx_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/odd"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "statusCode": 200,
                "message": "nope"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(Config::with_base_url(server.uri())).unwrap();
        let err = client
            .get::<serde_json::Value>("/odd", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn unreachable_host_classifies_as_network() {
        // Port 1 on loopback; nothing listens there.
        let client = ApiClient::new(Config::with_base_url("http://127.0.0.1:1")).unwrap();
        let err = client
            .get::<serde_json::Value>("/anything", None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 0);
    }
}
