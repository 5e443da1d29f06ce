//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] and renders `{"message": "..."}` with a
//! status code. Internal failures are logged in full; clients only see a
//! generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;
use zipbatch_core::TaskError;

use crate::schemas::ErrorResponse;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Rejected by the task service.
    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ServerError::Task(e) => {
                let status = match e {
                    TaskError::CapacityExceeded { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                    TaskError::ArchiverUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                    TaskError::NotFound(_)
                    | TaskError::TaskAlreadyFinalized(_)
                    | TaskError::InvalidUrl(_)
                    | TaskError::UnsupportedExtension { .. }
                    | TaskError::FileLimitExceeded { .. } => StatusCode::BAD_REQUEST,
                };
                (status, e.to_string())
            }
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::Io(e) => {
                error!(error = %e, "io error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ErrorResponse { message })).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn task_errors_map_to_client_statuses() {
        let cases = [
            (TaskError::CapacityExceeded { limit: 3 }, StatusCode::INTERNAL_SERVER_ERROR),
            (TaskError::NotFound("x".into()), StatusCode::BAD_REQUEST),
            (TaskError::InvalidUrl("x".into()), StatusCode::BAD_REQUEST),
            (TaskError::FileLimitExceeded { limit: 3 }, StatusCode::BAD_REQUEST),
            (TaskError::ArchiverUnavailable, StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, expected) in cases {
            let message = err.to_string();
            let (status, body) = ServerError::from(err).status_and_message();
            assert_eq!(status, expected);
            assert_eq!(body, message);
        }
    }

    #[test]
    fn internal_details_are_hidden() {
        let (status, message) =
            ServerError::Io(std::io::Error::other("/secret/path")).status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "internal server error");
    }
}
