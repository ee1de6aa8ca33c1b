//! Handlers for `/reports` and `/dashboard`.

use axum::{
  Json,
  extract::{Query, State},
};
use segak_core::{
  dashboard::DashboardSummary,
  report::{Report, ReportRequest, ReportScope},
  store::KvStore,
  student::Phase,
};
use serde::Deserialize;

use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
  Class,
  Form,
  School,
}

/// Flat query form of [`ReportRequest`].
#[derive(Debug, Deserialize)]
pub struct ReportParams {
  /// Inferred from the other parameters when absent.
  pub scope: Option<ScopeKind>,
  pub form:  Option<String>,
  pub class: Option<String>,
  pub phase: u8,
}

impl TryFrom<ReportParams> for ReportRequest {
  type Error = ApiError;

  fn try_from(p: ReportParams) -> Result<Self, ApiError> {
    let phase = Phase::try_from(p.phase).map_err(ApiError::BadRequest)?;
    let kind = p.scope.unwrap_or(match (&p.form, &p.class) {
      (Some(_), Some(_)) => ScopeKind::Class,
      (Some(_), None) => ScopeKind::Form,
      _ => ScopeKind::School,
    });
    let missing = |field: &str| ApiError::BadRequest(format!("{field} is required for this scope"));

    let scope = match kind {
      ScopeKind::Class => ReportScope::Class {
        form:  p.form.ok_or_else(|| missing("form"))?,
        class: p.class.ok_or_else(|| missing("class"))?,
      },
      ScopeKind::Form => ReportScope::Form { form: p.form.ok_or_else(|| missing("form"))? },
      ScopeKind::School => ReportScope::School,
    };
    Ok(ReportRequest { scope, phase })
  }
}

/// `GET /reports?scope=&form=&class=&phase=`
pub async fn report<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Query(params): Query<ReportParams>,
) -> Result<Json<Report>, ApiError>
where
  S: KvStore + 'static,
{
  let request = ReportRequest::try_from(params)?;
  let report = state.segak.lock().await.report(&request);
  Ok(Json(report))
}

/// `GET /dashboard`
pub async fn dashboard<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
) -> Json<DashboardSummary>
where
  S: KvStore + 'static,
{
  Json(state.segak.lock().await.dashboard())
}
