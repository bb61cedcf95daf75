//! API Error Handling
//!
//! Unified error types and conversion for API responses. Error bodies carry a
//! stable `code` (`not-authorized`, `missing-input`, `internal-failure`, ...)
//! alongside a human readable message.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::DispatchError;
use crate::service::client_service::ClientError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotAuthorized(String),
    MissingInput(String),
    NotFound(String),
    BadRequest(String),
    DatabaseError(sqlx::Error),
    InternalError(String),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::NotAuthorized(_) => "not-authorized",
            ApiError::MissingInput(_) => "missing-input",
            ApiError::NotFound(_) => "not-found",
            ApiError::BadRequest(_) => "invalid-input",
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => "internal-failure",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match self {
            ApiError::NotAuthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::MissingInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (
            status,
            Json(serde_json::json!({ "error": { "code": code, "message": message } })),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

/// Unreadable or non-JSON bodies carry no usable client identity
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MissingInput(format!(
            "client_id is required in a JSON body: {}",
            rejection.body_text()
        ))
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::MissingInput(msg) => ApiError::MissingInput(msg),
            ClientError::NotAuthorized(msg) => ApiError::NotAuthorized(msg),
            ClientError::NotFound(id) => ApiError::NotFound(format!("Client {} not found", id)),
            ClientError::ValidationError(msg) => ApiError::BadRequest(msg),
            ClientError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Selection(source) => {
                ApiError::InternalError(format!("Failed to select a run: {}", source))
            }
            DispatchError::StubIssuance { assignment_id, .. } => ApiError::InternalError(format!(
                "Creation of result entry for assignment {} failed",
                assignment_id
            )),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
