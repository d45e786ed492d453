use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use technews_db::StoreError;
use technews_types::api::{MessageResponse, StoreErrorBody};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Any store failure. Surfaces as a 500 carrying the serialized error.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(entity: &str) -> Self {
        ApiError::NotFound(format!("No {} found with this id", entity))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Store(e) => {
                error!("Store error: {}", e);
                let body = StoreErrorBody {
                    name: e.name().to_string(),
                    message: e.to_string(),
                    field: e.field().map(str::to_string),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(MessageResponse { message })).into_response()
            }
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(MessageResponse { message })).into_response()
            }
            ApiError::Internal(message) => {
                error!("Internal error: {}", message);
                let body = StoreErrorBody {
                    name: "InternalError".to_string(),
                    message,
                    field: None,
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
