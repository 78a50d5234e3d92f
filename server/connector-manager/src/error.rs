//! API error taxonomy and its HTTP mapping.
//!
//! Error bodies are `{"detail": <message>}` — the shape the frontend already
//! consumes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  /// The EDC Management API answered with an error; its status is mirrored.
  #[error("{detail}")]
  Upstream { status: u16, detail: String },

  #[error("Connection error to EDC: {0}")]
  Unreachable(String),

  #[error("database: {0}")]
  Db(#[from] mongodb::error::Error),

  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  pub fn not_found(detail: impl Into<String>) -> Self {
    Self::NotFound(detail.into())
  }

  pub fn bad_request(detail: impl Into<String>) -> Self {
    Self::BadRequest(detail.into())
  }

  pub fn internal(detail: impl Into<String>) -> Self {
    Self::Internal(detail.into())
  }

  fn status(&self) -> StatusCode {
    match self {
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Upstream { status, .. } => {
        StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
      }
      Self::Unreachable(_) => StatusCode::BAD_GATEWAY,
      Self::Db(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!("{}: {}", status, self);
    }
    (status, Json(json!({ "detail": self.to_string() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn statuses_map_like_the_rest_api() {
    assert_eq!(
      ApiError::not_found("EDC not found").status(),
      StatusCode::NOT_FOUND
    );
    assert_eq!(
      ApiError::bad_request("invalid connector id").status(),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      ApiError::Unreachable("refused".into()).status(),
      StatusCode::BAD_GATEWAY
    );
    assert_eq!(
      ApiError::internal("boom").status(),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }

  #[test]
  fn upstream_status_is_mirrored() {
    let err = ApiError::Upstream {
      status: 409,
      detail: "EDC error: duplicate".into(),
    };
    assert_eq!(err.status(), StatusCode::CONFLICT);
    assert_eq!(err.to_string(), "EDC error: duplicate");
  }

  #[test]
  fn bogus_upstream_status_falls_back_to_bad_gateway() {
    let err = ApiError::Upstream {
      status: 42,
      detail: "EDC error: ?".into(),
    };
    assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
  }
}
