//! API error envelope shared by all handlers.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Serializable error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code (e.g. "not_found", "invalid_token", "conflict")
    pub error: String,
    /// Human-readable error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl ApiError {
    pub fn invalid_token(description: impl Into<String>) -> Self {
        Self {
            error: "invalid_token".to_string(),
            error_description: Some(description.into()),
        }
    }

    pub fn forbidden(description: impl Into<String>) -> Self {
        Self {
            error: "forbidden".to_string(),
            error_description: Some(description.into()),
        }
    }

    pub fn not_found(description: impl Into<String>) -> Self {
        Self {
            error: "not_found".to_string(),
            error_description: Some(description.into()),
        }
    }

    pub fn bad_request(description: impl Into<String>) -> Self {
        Self {
            error: "bad_request".to_string(),
            error_description: Some(description.into()),
        }
    }

    pub fn conflict(description: impl Into<String>) -> Self {
        Self {
            error: "conflict".to_string(),
            error_description: Some(description.into()),
        }
    }

    pub fn invalid_reading(description: impl Into<String>) -> Self {
        Self {
            error: "invalid_reading".to_string(),
            error_description: Some(description.into()),
        }
    }

    pub fn server_error() -> Self {
        Self {
            error: "server_error".to_string(),
            error_description: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.as_str() {
            "invalid_token" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "invalid_reading" => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(e: sea_orm::DbErr) -> Self {
        tracing::error!(error = ?e, "database error");
        ApiError::server_error()
    }
}

impl From<crate::monitor::MonitorError> for ApiError {
    fn from(e: crate::monitor::MonitorError) -> Self {
        use crate::monitor::MonitorError;
        match e {
            MonitorError::RoomNotFound(_)
            | MonitorError::AlertNotFound(_)
            | MonitorError::UserNotFound(_) => ApiError::not_found(e.to_string()),
            MonitorError::AlreadyResolved(_) => ApiError::conflict(e.to_string()),
            MonitorError::ImplausibleReading(_) => ApiError::invalid_reading(e.to_string()),
            MonitorError::Db(db) => db.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_kind() {
        assert_eq!(
            ApiError::invalid_token("x").into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::forbidden("x").into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::not_found("x").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::bad_request("x").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::conflict("x").into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::invalid_reading("x").into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::server_error().into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
