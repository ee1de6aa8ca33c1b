//! Handlers for `/users` endpoints. All of them are admin only.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use segak_core::{
  store::KvStore,
  user::{NewUser, UserProfile},
};

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// `GET /users`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentUser(actor): CurrentUser,
) -> Result<Json<Vec<UserProfile>>, ApiError>
where
  S: KvStore + 'static,
{
  Ok(Json(state.segak.lock().await.users(&actor)?))
}

/// `POST /users` — body: `{"name":"…","userId":"…","password":"…","role":"Guru"}`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentUser(actor): CurrentUser,
  Json(body): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError>
where
  S: KvStore + 'static,
{
  let profile = state.segak.lock().await.add_user(&actor, body).await?;
  Ok((StatusCode::CREATED, Json(profile)))
}

/// `DELETE /users/{id}` — `409` for admin accounts.
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  CurrentUser(actor): CurrentUser,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: KvStore + 'static,
{
  state.segak.lock().await.delete_user(&actor, &id).await?;
  Ok(StatusCode::NO_CONTENT)
}
