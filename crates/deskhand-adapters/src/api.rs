//! Shared plumbing for Google REST calls.
//!
//! Google APIs report failures with an envelope of the form
//! `{"error": {"code": 404, "message": "...", "status": "NOT_FOUND"}}`;
//! [`ApiError::Status`] carries the HTTP status and that message.

use deskhand_auth_engine::AuthEngineError;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Error from a provider REST call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure (DNS, connect, TLS, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    Request(String),
}

impl From<AuthEngineError> for ApiError {
    fn from(err: AuthEngineError) -> Self {
        Self::Request(err.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Send `request` and decode a JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> ApiResult<T> {
    let response = check_status(request.send().await?).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Send `request` and discard the body.
pub(crate) async fn send_empty(request: RequestBuilder) -> ApiResult<()> {
    check_status(request.send().await?).await?;
    Ok(())
}

async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => body.trim().to_string(),
    };

    tracing::debug!(status = status.as_u16(), %message, "api call rejected");
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Thing {
        id: String,
    }

    #[tokio::test]
    async fn decodes_success_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/thing")
            .with_status(200)
            .with_body(r#"{"id":"t1"}"#)
            .create_async()
            .await;

        let request = reqwest::Client::new().get(format!("{}/thing", server.url()));
        let thing: Thing = send_json(request).await.unwrap();
        assert_eq!(thing.id, "t1");
    }

    #[tokio::test]
    async fn maps_google_error_envelope() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/thing")
            .with_status(403)
            .with_body(
                r#"{"error":{"code":403,"message":"Insufficient Permission","status":"PERMISSION_DENIED"}}"#,
            )
            .create_async()
            .await;

        let request = reqwest::Client::new().get(format!("{}/thing", server.url()));
        let err = send_json::<Thing>(request).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 403: Insufficient Permission");
    }

    #[tokio::test]
    async fn empty_error_body_uses_reason_phrase() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("DELETE", "/thing")
            .with_status(410)
            .create_async()
            .await;

        let request = reqwest::Client::new().delete(format!("{}/thing", server.url()));
        let err = send_empty(request).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 410: Gone");
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/thing")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let request = reqwest::Client::new().get(format!("{}/thing", server.url()));
        assert!(matches!(
            send_json::<Thing>(request).await,
            Err(ApiError::Decode(_))
        ));
    }
}
