//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("{0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("{0}")]
  Unprocessable(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<segak_core::Error> for ApiError {
  fn from(e: segak_core::Error) -> Self {
    use segak_core::Error as E;

    let message = e.to_string();
    match e {
      E::InvalidCredentials => Self::Unauthorized,
      E::Forbidden { .. } => Self::Forbidden(message),
      E::StudentNotFound(_) | E::UserNotFound(_) => Self::NotFound(message),
      E::ProtectedAdmin | E::DuplicateLogin(_) | E::PhaseNotActive { .. } => {
        Self::Conflict(message)
      }
      E::MissingField(_)
      | E::EvidenceRequired(_)
      | E::InvalidEvidence(_)
      | E::InvalidRestore(_) => Self::Unprocessable(message),
      other @ (E::Serialization(_) | E::PasswordHash(_) | E::Store(_)) => {
        Self::Internal(Box::new(other))
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };

    let mut res = (status, Json(json!({ "error": self.to_string() }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"segak\""),
      );
    }
    res
  }
}
