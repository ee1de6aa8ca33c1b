//! Handlers for `/settings` and `/year`.

use axum::{Json, extract::State};
use segak_core::{settings::TeacherSettings, store::KvStore};
use serde::{Deserialize, Serialize};

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// `GET /settings`
pub async fn get_settings<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
) -> Json<TeacherSettings>
where
  S: KvStore + 'static,
{
  Json(state.segak.lock().await.settings().clone())
}

/// `PUT /settings` — admin only.
pub async fn save_settings<S>(
  State(state): State<AppState<S>>,
  CurrentUser(actor): CurrentUser,
  Json(body): Json<TeacherSettings>,
) -> Result<Json<TeacherSettings>, ApiError>
where
  S: KvStore + 'static,
{
  let saved = state.segak.lock().await.save_settings(&actor, body).await?;
  Ok(Json(saved))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Year {
  pub tahun: String,
}

/// `GET /year`
pub async fn get_year<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
) -> Json<Year>
where
  S: KvStore + 'static,
{
  Json(Year { tahun: state.segak.lock().await.active_year().to_owned() })
}

/// `PUT /year` — body: `{"tahun":"2026"}`
pub async fn set_year<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Json(body): Json<Year>,
) -> Result<Json<Year>, ApiError>
where
  S: KvStore + 'static,
{
  let mut segak = state.segak.lock().await;
  segak.set_active_year(&body.tahun).await?;
  Ok(Json(Year { tahun: segak.active_year().to_owned() }))
}
