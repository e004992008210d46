use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure taxonomy for every operation. Each variant carries the message the
/// client sees; the HTTP status distinguishes the category.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("invalid username/email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthorized(String),
    #[error("invalid or expired token")]
    TokenInvalid,
    #[error("refresh token is expired or already used")]
    TokenExpiredOrReused,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    UploadFailed(String),
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InvalidCredentials
            | ApiError::Unauthorized(_)
            | ApiError::TokenInvalid
            | ApiError::TokenExpiredOrReused => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UploadFailed(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            // the cause stays in the logs; the client gets a generic message
            error!(error = ?err, "internal error");
        }
        let status = self.status();
        let body = json!({
            "statusCode": status.as_u16(),
            "message": self.to_string(),
            "success": false,
            "errors": [],
        });
        (status, Json(body)).into_response()
    }
}
