use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};
use std::fmt;

use crate::models::LeadResponse;

/// Application-specific error types.
///
/// Every variant is terminal for the submission being processed.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Request body could not be parsed as JSON.
    MalformedInput(String),
    /// One message per failed field check.
    ValidationFailed(Vec<String>),
    /// Referenced resource does not exist.
    NotFound(String),
    /// The submission was already registered.
    Conflict(String),
    /// The Pipefy API reported errors; the array is passed through untouched.
    UpstreamError(Vec<Value>),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Builds an upstream error from a single message, for failures that never
    /// reached the API's own error reporting (transport, unexpected payloads).
    pub fn upstream_message(message: impl Into<String>) -> Self {
        AppError::UpstreamError(vec![json!({ "message": message.into() })])
    }

    /// Strips any context wrappers and returns the underlying error.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MalformedInput(_) | AppError::ValidationFailed(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UpstreamError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::WithContext { source, .. } => source.status_code(),
        }
    }

    /// JSON body for this error: `{ "errors": [...] }`.
    pub fn body(&self) -> Value {
        let errors = match self {
            AppError::MalformedInput(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => vec![json!({ "message": msg })],
            AppError::ValidationFailed(messages) => messages
                .iter()
                .map(|msg| json!({ "message": msg }))
                .collect(),
            AppError::UpstreamError(errors) => errors.clone(),
            AppError::WithContext { source, .. } => return source.body(),
        };

        json!({ "errors": errors })
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MalformedInput(msg) => write!(f, "Malformed input: {}", msg),
            AppError::ValidationFailed(messages) => {
                write!(f, "Validation failed: {}", messages.join("; "))
            }
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::UpstreamError(errors) => {
                write!(f, "Upstream error: {}", Value::Array(errors.clone()))
            }
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl From<AppError> for LeadResponse {
    /// Converts the error into the workflow response, logging by severity.
    fn from(err: AppError) -> Self {
        match err.root() {
            AppError::UpstreamError(_) => tracing::error!("{}", err),
            AppError::MalformedInput(_) | AppError::ValidationFailed(_) => {
                tracing::warn!("{}", err)
            }
            _ => tracing::info!("{}", err),
        }

        LeadResponse::new(err.status_code(), err.body())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        LeadResponse::from(self).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    fn from(err: reqwest::Error) -> Self {
        AppError::upstream_message(format!("Pipefy request failed: {}", err))
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
