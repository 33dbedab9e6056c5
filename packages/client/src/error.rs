//! Error types for the gateway client.

use std::sync::Arc;

use apiloom_http::HttpResponse;

use crate::envelope::ResponseEnvelope;

/// A failed HTTP exchange, carrying whatever the gateway said about it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("HTTP {status}{}", format_errors(.errors))]
pub struct HttpError {
    pub status: u16,

    /// Messages from the envelope's `errors` field, empty if none were parsed.
    pub errors: Vec<String>,

    /// Raw response body, kept for diagnostics.
    pub body: String,
}

fn format_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        String::new()
    } else {
        format!(": {}", errors.join(", "))
    }
}

impl HttpError {
    pub fn from_response(response: &HttpResponse) -> Self {
        ResponseEnvelope::parse(response.status, &response.body).into_http_error()
    }
}

/// Errors that can occur when talking to the gateway.
///
/// Errors are `Clone` because one outcome is handed to every caller that
/// shares a cached request or a batch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The gateway answered with a failure status.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The exchange itself failed.
    #[error("transport error: {0}")]
    Transport(Arc<apiloom_http::Error>),

    /// A capability was invoked on a client that does not provide it.
    #[error("Not Implemented: {capability}")]
    NotImplemented { capability: &'static str },

    /// The payload did not have the shape the caller asked for.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// A batch was abandoned before its outcome was delivered.
    #[error("scheduler error: {message}")]
    Scheduler { message: String },
}

impl ApiError {
    /// HTTP status of the failure, if the gateway answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http(e) => Some(e.status),
            _ => None,
        }
    }
}

impl From<apiloom_http::Error> for ApiError {
    fn from(error: apiloom_http::Error) -> Self {
        ApiError::Transport(Arc::new(error))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::Decode {
            message: error.to_string(),
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;
