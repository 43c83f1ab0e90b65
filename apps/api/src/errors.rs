use std::fmt::Display;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::retry::RetryError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The upstream answered, but not with something usable.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Every attempt timed out.
    #[error("Upstream timed out after {attempts} attempt(s)")]
    UpstreamTimeout { attempts: u32 },

    /// Every attempt failed with a transient error.
    #[error("Upstream unavailable after {attempts} attempt(s): {message}")]
    UpstreamUnavailable { attempts: u32, message: String },

    /// The server is shutting down and cancelled the call.
    #[error("Request cancelled")]
    Cancelled,
}

impl<E: Display> From<RetryError<E>> for AppError {
    fn from(err: RetryError<E>) -> Self {
        if err.is_aborted() {
            return AppError::Cancelled;
        }
        if err.is_timeout() {
            return AppError::UpstreamTimeout {
                attempts: err.attempts(),
            };
        }
        match err {
            RetryError::Exhausted {
                attempts,
                last_error,
            } => AppError::UpstreamUnavailable {
                attempts,
                message: last_error.to_string(),
            },
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "An upstream service returned an error".to_string(),
                )
            }
            AppError::UpstreamTimeout { attempts } => {
                tracing::warn!("Upstream timed out after {attempts} attempt(s)");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "UPSTREAM_TIMEOUT",
                    "An upstream service did not respond in time".to_string(),
                )
            }
            AppError::UpstreamUnavailable { attempts, message } => {
                tracing::warn!("Upstream unavailable after {attempts} attempt(s): {message}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "UPSTREAM_UNAVAILABLE",
                    "An upstream service is unavailable, try again later".to_string(),
                )
            }
            AppError::Cancelled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CANCELLED",
                "The request was cancelled".to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
