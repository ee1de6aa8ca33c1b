//! Handlers for `/session`.
//!
//! The stored session records who last logged in, as the browser application
//! did. Request authorisation never depends on it; every call carries its own
//! credentials.

use axum::{Json, extract::State, http::StatusCode};
use segak_core::{store::KvStore, user::UserProfile};
use serde::Deserialize;

use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  #[serde(rename = "userId")]
  pub login_id: String,
  pub password: String,
}

/// `GET /session` — the persisted session, or `null`.
pub async fn current<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
) -> Json<Option<UserProfile>>
where
  S: KvStore + 'static,
{
  Json(state.segak.lock().await.session().cloned())
}

/// `POST /session` — body: `{"userId":"…","password":"…"}`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<UserProfile>, ApiError>
where
  S: KvStore + 'static,
{
  let profile = state
    .segak
    .lock()
    .await
    .login(&body.login_id, &body.password)
    .await?;
  Ok(Json(profile))
}

/// `DELETE /session`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
) -> Result<StatusCode, ApiError>
where
  S: KvStore + 'static,
{
  state.segak.lock().await.logout().await?;
  Ok(StatusCode::NO_CONTENT)
}
