//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use heartsync_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// Transient contention that outlived the engine's retry budget. The
  /// client may simply try again.
  #[error("busy: {0}")]
  Busy(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    match e {
      CoreError::EmptyIdentity(_) | CoreError::SelfCrush(_) => {
        ApiError::BadRequest(e.to_string())
      }
      CoreError::SeasonNotFound(_) | CoreError::SubmissionNotFound(_) => {
        ApiError::NotFound(e.to_string())
      }
      CoreError::SeasonClosed(_) | CoreError::SeasonExists(_) => {
        ApiError::Conflict(e.to_string())
      }
      CoreError::Conflict(m) => ApiError::Busy(m),
      CoreError::Storage(_) | CoreError::Serialization(_) => {
        ApiError::Internal(e.to_string())
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized => {
        return (
          StatusCode::UNAUTHORIZED,
          [(header::WWW_AUTHENTICATE, "Basic realm=\"heartsync\"")],
          Json(json!({ "error": "unauthorized" })),
        )
          .into_response();
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Busy(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
      ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
