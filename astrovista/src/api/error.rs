//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::origin::OriginError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid date format. Use YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Invalid date range")]
    InvalidRange(String),

    #[error("Invalid request body")]
    InvalidBody(String),

    #[error("Unauthorized - Valid API token required")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String, Option<String>),

    #[error("APOD already exists for this date")]
    Conflict(String),

    #[error("Error querying the origin store")]
    Origin(#[from] OriginError),

    #[error("Origin store did not respond in time")]
    Timeout,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidDate(_) | ApiError::InvalidRange(_) | ApiError::InvalidBody(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(..) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Origin(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ApiError::InvalidDate(d)
            | ApiError::InvalidRange(d)
            | ApiError::InvalidBody(d)
            | ApiError::Conflict(d) => Some(d.clone()),
            ApiError::NotFound(_, d) => d.clone(),
            ApiError::Origin(e) => Some(e.to_string()),
            ApiError::Unauthorized | ApiError::Timeout => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {} ({:?})", self, self.details());
        }

        let body = ErrorBody {
            error: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Conflict("2023-01-01".to_string()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Origin(OriginError::Unavailable("down".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_details() {
        let err = ApiError::InvalidDate("2023-13-01".to_string());
        assert_eq!(err.details().as_deref(), Some("2023-13-01"));
        assert_eq!(ApiError::Timeout.details(), None);
    }
}
