//! HTTP Basic-auth extractor resolving to a SEGAK user.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use segak_core::{auth, store::KvStore, user::UserProfile};

use crate::{AppState, error::ApiError};

/// The authenticated caller. Present in a handler means the request carried
/// valid credentials for a stored account.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserProfile);

/// Decode `Authorization: Basic …` into `(login_id, password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (login_id, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((login_id.to_owned(), password.to_owned()))
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: KvStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let (login_id, password) = basic_credentials(&parts.headers)?;
    let (profile, hash) = state
      .segak
      .lock()
      .await
      .credentials(&login_id)
      .ok_or(ApiError::Unauthorized)?;

    // argon2 is slow; verify off the runtime and without the controller lock.
    let verified =
      tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(Box::new(e)))?;
    if !verified {
      return Err(ApiError::Unauthorized);
    }
    Ok(CurrentUser(profile))
  }
}
