//! Error responses for the management API

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ErrorKind, ProxyError};

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

/// A [`ProxyError`] on its way to becoming an HTTP response
#[derive(Debug)]
pub struct ApiError(pub ProxyError);

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::UnknownBackend => StatusCode::NOT_FOUND,
            ErrorKind::DuplicateName => StatusCode::CONFLICT,
            ErrorKind::InvalidDescriptor => StatusCode::BAD_REQUEST,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ProxyError> for ApiError {
    fn from(e: ProxyError) -> Self {
        Self(e)
    }
}

impl From<crate::types::ValidationError> for ApiError {
    fn from(e: crate::types::ValidationError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = %status, error = %self.0, "Request failed");
        } else {
            debug!(status = %status, error = %self.0, "Request rejected");
        }
        let body = ErrorBody {
            error: self.0.kind().as_str(),
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValidationError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ProxyError::UnknownBackend("a".into()), StatusCode::NOT_FOUND),
            (
                ProxyError::DuplicateName("a".parse().unwrap()),
                StatusCode::CONFLICT,
            ),
            (
                ProxyError::InvalidDescriptor(ValidationError::ZeroTimeout),
                StatusCode::BAD_REQUEST,
            ),
            (
                ProxyError::Backpressure {
                    backend: "a".into(),
                    depth: 4,
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(ApiError(error).status(), expected);
        }
    }
}
