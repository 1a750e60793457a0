//! Mapping of service failures to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use plocky_core::PortError;
use thiserror::Error;
use tracing::{debug, error};

/// Anything a handler can fail with.
#[derive(Error, Debug)]
pub enum AppError {
    /// The request carried no member identity.
    #[error("Missing member identity")]
    MissingIdentity,

    /// A service or adapter failed.
    #[error(transparent)]
    Port(#[from] PortError),
}

impl AppError {
    /// HTTP status reported for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingIdentity => StatusCode::UNAUTHORIZED,
            AppError::Port(err) => match err {
                PortError::NotFound(_) => StatusCode::NOT_FOUND,
                PortError::Forbidden => StatusCode::FORBIDDEN,
                PortError::Conflict(_) => StatusCode::CONFLICT,
                PortError::Validation(_) => StatusCode::BAD_REQUEST,
                PortError::Network(source) if source.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
                PortError::Network(_) | PortError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
                PortError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(%status, error = %self, "Request failed");
        } else {
            debug!(%status, error = %self, "Request rejected");
        }

        (status, self.to_string()).into_response()
    }
}
