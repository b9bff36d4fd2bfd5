use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use playground_db::{FieldErrors, StoreError};
use playground_geo::GeocodeError;
use playground_types::api::ErrorResponse;

use crate::response::ApiJson;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("invalid fields ({0})")]
    Validation(FieldErrors),

    #[error("already exists ({0})")]
    Conflict(FieldErrors),

    #[error("{0}")]
    NotFound(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    /// A path segment that should have been a number.
    #[error("malformed path parameter '{0}'")]
    BadPath(String),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::PlaygroundNotFound(_) | StoreError::CommentNotFound { .. } => {
                ApiError::NotFound(e.to_string())
            }
            StoreError::Invalid(fields) => ApiError::Validation(fields),
            StoreError::Conflict(fields) => ApiError::Conflict(fields),
            StoreError::Forbidden { .. } => ApiError::Forbidden(e.to_string()),
            StoreError::Backend(e) => ApiError::Internal(e),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadPath(_) | ApiError::Geocode(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Validation(_) => "validation",
            ApiError::Conflict(_) => "conflict",
            ApiError::NotFound(_) => "not_found",
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::BadPath(_) => "bad_path",
            ApiError::Geocode(_) => "geocode",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Causes stay in the log
        match &self {
            ApiError::Internal(cause) => error!("Request failed: {:#}", cause),
            ApiError::Geocode(cause) => warn!("Geocoding failed: {:?}", cause),
            _ => {}
        }

        let fields = match &self {
            ApiError::Validation(fields) | ApiError::Conflict(fields) => fields.to_map(),
            _ => Default::default(),
        };
        let message = match &self {
            ApiError::Geocode(_) => "could not resolve address".to_string(),
            ApiError::Validation(_) => "invalid fields".to_string(),
            ApiError::Conflict(_) => "a playground with the same data already exists".to_string(),
            other => other.to_string(),
        };

        ApiJson(
            self.status(),
            ErrorResponse {
                error: self.kind().to_string(),
                message,
                fields,
            },
        )
        .into_response()
    }
}

/// Parses a numeric path segment.
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadPath(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::PlaygroundNotFound(3), StatusCode::NOT_FOUND),
            (StoreError::Invalid(FieldErrors::new()), StatusCode::BAD_REQUEST),
            (StoreError::Conflict(FieldErrors::new()), StatusCode::CONFLICT),
            (
                StoreError::Forbidden { username: "bob".into() },
                StatusCode::FORBIDDEN,
            ),
            (
                StoreError::Backend(anyhow::anyhow!("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn backend_cause_is_not_exposed() {
        let err = ApiError::from(StoreError::Backend(anyhow::anyhow!("secret path /var/db")));
        assert_eq!(err.to_string(), "internal server error");
    }

    #[test]
    fn path_ids() {
        assert_eq!(parse_id("12").unwrap(), 12);
        assert!(matches!(parse_id("abc"), Err(ApiError::BadPath(_))));
    }
}
