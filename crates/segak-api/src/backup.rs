//! Handlers for `/backup`. Admin only.

use axum::{
  Json,
  extract::State,
  http::header,
  response::IntoResponse,
};
use segak_core::{backup::RestoreSummary, store::KvStore};

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// `GET /backup` — every student of every year, as a JSON attachment.
pub async fn export<S>(
  State(state): State<AppState<S>>,
  CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: KvStore + 'static,
{
  let backup = state.segak.lock().await.export_backup(&actor)?;
  let disposition = format!("attachment; filename=\"{}\"", backup.file_name);
  Ok((
    [
      (header::CONTENT_TYPE, "application/json".to_owned()),
      (header::CONTENT_DISPOSITION, disposition),
    ],
    backup.contents,
  ))
}

/// `POST /backup` — body: a previously exported file. Replaces the whole
/// student collection; on any error nothing changes.
pub async fn restore<S>(
  State(state): State<AppState<S>>,
  CurrentUser(actor): CurrentUser,
  body: String,
) -> Result<Json<RestoreSummary>, ApiError>
where
  S: KvStore + 'static,
{
  let summary = state.segak.lock().await.restore_backup(&actor, &body).await?;
  Ok(Json(summary))
}
