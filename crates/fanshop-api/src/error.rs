use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use fanshop_persist::PersistError;
use fanshop_reports::ReportError;
use fanshop_types::ValidationError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{message}")]
    Validation { field: Option<String>, message: String },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Persistence error: {0}")]
    Persist(PersistError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        ApiError::NotFound { kind, id: id.into() }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

impl From<PersistError> for ApiError {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::NotFound { kind, id } => ApiError::NotFound { kind, id },
            PersistError::Duplicate { kind, id } => {
                ApiError::Conflict(format!("{} already exists: {}", kind, id))
            }
            other => ApiError::Persist(other),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation {
            field: Some(err.field),
            message: err.message,
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        ApiError::field(err.field(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, field) = match self {
            ApiError::NotFound { .. } => (StatusCode::NOT_FOUND, self.to_string(), None),
            ApiError::Validation { field, message } => (StatusCode::BAD_REQUEST, message, field),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string(), None),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message, None),
            ApiError::Persist(ref e) => {
                tracing::error!("Persistence error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string(), None)
            }
            ApiError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string(), None)
            }
        };

        let body = match field {
            Some(field) => json!({ "error": message, "field": field }),
            None => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::not_found("order", "o1"), StatusCode::NOT_FOUND),
            (ApiError::field("fromDate", "bad"), StatusCode::BAD_REQUEST),
            (ApiError::BadRequest("x".to_string()), StatusCode::BAD_REQUEST),
            (
                ApiError::from(PersistError::Duplicate { kind: "order", id: "o1".to_string() }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(PersistError::Internal("boom".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_persist_not_found_maps_to_404() {
        let err = ApiError::from(PersistError::not_found("product", "p1"));
        assert!(matches!(err, ApiError::NotFound { kind: "product", .. }));
    }
}
