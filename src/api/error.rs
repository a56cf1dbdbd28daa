use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::Error;

/// An [`Error`] on its way out as an HTTP response.
///
/// Client faults keep their message. Server faults are logged in full and the
/// client only sees a generic message, so storage details never leak.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) | Error::NotEnrolled => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials | Error::TokenExpired | Error::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }
            Error::CourseNotFound => StatusCode::NOT_FOUND,
            Error::DuplicateIdentity | Error::AlreadyEnrolled | Error::AlreadyRated => {
                StatusCode::CONFLICT
            }
            Error::StorageTimeout => StatusCode::SERVICE_UNAVAILABLE,
            Error::HashingFailure(_) | Error::Storage(_) | Error::Worker(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if self.0.is_client_fault() {
            tracing::debug!("Request rejected: {}", self.0);
            self.0.to_string()
        } else {
            tracing::error!("Internal error: {}", self.0);
            "Internal server error".to_string()
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
