//! Mapping from rating errors to HTTP responses

use crate::error::{classify, RatingError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Error returned by every API handler
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl ApiError {
    /// HTTP status for the wrapped error
    pub fn status(&self) -> StatusCode {
        match classify(&self.0) {
            Some(RatingError::Validation { .. }) => StatusCode::BAD_REQUEST,
            Some(RatingError::TeamNotFound { .. }) | Some(RatingError::SnapshotNotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            Some(RatingError::Provider { .. }) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn retryable(&self) -> bool {
        classify(&self.0).is_some_and(RatingError::is_retryable)
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {:#}", self.0);
        } else {
            warn!("Request rejected: {:#}", self.0);
        }

        let body = json!({
            "error": format!("{:#}", self.0),
            "retryable": self.retryable(),
        });
        (status, Json(body)).into_response()
    }
}
