use crate::core::{GatewayError, RecordError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::Gateway(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch rates".to_string(),
                None,
            ),
            ApiError::Record(RecordError::Validation(_)) => (
                StatusCode::BAD_REQUEST,
                "Missing required fields".to_string(),
                None,
            ),
            ApiError::Record(RecordError::StoreUnavailable) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Database not available".to_string(),
                None,
            ),
            ApiError::Record(RecordError::Write { details }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save conversion".to_string(),
                Some(details),
            ),
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason, None),
        };
        (status, Json(ErrorBody { error, details })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
