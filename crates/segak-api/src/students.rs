//! Handlers for `/students` endpoints.
//!
//! Listing is limited to the active year; lookups by id reach every year.

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use segak_core::{
  bmi::BmiCategory,
  roster::{self, BulkMeta, RosterEntry, StudentFilter},
  status::{self, PhaseView, StatusChange, StatusScope},
  store::KvStore,
  student::{Evidence, NewStudent, Phase, Student, StudentStatus, StudentUpdate, TestResultInput},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, auth::CurrentUser, error::ApiError};

// ─── Views ────────────────────────────────────────────────────────────────────

/// What one phase cell of the roster shows.
#[derive(Debug, Serialize)]
pub struct PhaseSummary {
  pub view:         PhaseView,
  #[serde(rename = "kategoriBmi", skip_serializing_if = "Option::is_none")]
  pub bmi_category: Option<&'static str>,
}

/// A student record with its per-phase presentation attached.
#[derive(Debug, Serialize)]
pub struct StudentView {
  #[serde(flatten)]
  pub student: Student,
  /// Keyed by phase number.
  pub fasa:    BTreeMap<u8, PhaseSummary>,
}

impl From<&Student> for StudentView {
  fn from(student: &Student) -> Self {
    let fasa = [Phase::One, Phase::Two]
      .into_iter()
      .map(|phase| {
        let summary = PhaseSummary {
          view:         status::phase_view(student, phase),
          bmi_category: student
            .result(phase)
            .and_then(|r| BmiCategory::classify(r.bmi))
            .map(BmiCategory::label),
        };
        (phase.number(), summary)
      })
      .collect();
    Self { student: student.clone(), fasa }
  }
}

fn parse_phase(n: u8) -> Result<Phase, ApiError> { Phase::try_from(n).map_err(ApiError::BadRequest) }

// ─── List / create ────────────────────────────────────────────────────────────

/// `GET /students[?search=&form=&status=]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Query(filter): Query<StudentFilter>,
) -> Json<Vec<StudentView>>
where
  S: KvStore + 'static,
{
  let segak = state.segak.lock().await;
  let students = segak
    .search_students(&filter)
    .into_iter()
    .map(StudentView::from)
    .collect();
  Json(students)
}

/// `POST /students`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Json(body): Json<NewStudent>,
) -> Result<impl IntoResponse, ApiError>
where
  S: KvStore + 'static,
{
  let student = state.segak.lock().await.add_student(body).await?;
  Ok((StatusCode::CREATED, Json(student)))
}

// ─── Bulk import ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PreviewBody {
  pub text: String,
}

/// `POST /students/bulk/preview` — parse only; recomputed from scratch on
/// every call.
pub async fn bulk_preview<S>(
  CurrentUser(_): CurrentUser,
  Json(body): Json<PreviewBody>,
) -> Json<Vec<RosterEntry>>
where
  S: KvStore + 'static,
{
  Json(roster::parse_bulk(&body.text))
}

#[derive(Debug, Deserialize)]
pub struct CommitBody {
  #[serde(flatten)]
  pub meta:    BulkMeta,
  pub entries: Vec<RosterEntry>,
}

/// `POST /students/bulk` — commit confirmed entries under one placement.
pub async fn bulk_commit<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Json(body): Json<CommitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: KvStore + 'static,
{
  let added = state
    .segak
    .lock()
    .await
    .add_students_bulk(body.entries, &body.meta)
    .await?;
  Ok((StatusCode::CREATED, Json(added)))
}

// ─── One student ──────────────────────────────────────────────────────────────

/// `GET /students/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path(id): Path<String>,
) -> Result<Json<StudentView>, ApiError>
where
  S: KvStore + 'static,
{
  let segak = state.segak.lock().await;
  Ok(Json(StudentView::from(segak.student(&id)?)))
}

/// `PATCH /students/{id}` — absent fields are left unchanged.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path(id): Path<String>,
  Json(body): Json<StudentUpdate>,
) -> Result<Json<Student>, ApiError>
where
  S: KvStore + 'static,
{
  let student = state.segak.lock().await.update_student(&id, body).await?;
  Ok(Json(student))
}

/// `DELETE /students/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: KvStore + 'static,
{
  state.segak.lock().await.delete_student(&id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Results and status ───────────────────────────────────────────────────────

/// `PUT /students/{id}/results/{phase}`
pub async fn record_result<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path((id, phase)): Path<(String, u8)>,
  Json(body): Json<TestResultInput>,
) -> Result<Json<Student>, ApiError>
where
  S: KvStore + 'static,
{
  let phase = parse_phase(phase)?;
  let student = state
    .segak
    .lock()
    .await
    .record_result(&id, phase, body)
    .await?;
  Ok(Json(student))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub scope:    StatusScope,
  pub status:   StudentStatus,
  /// A `data:` URL.
  #[serde(rename = "suratBukti", default)]
  pub evidence: Option<String>,
}

/// `PUT /students/{id}/status` — body:
/// `{"scope":"fasa1|fasa2|kekal","status":"…","suratBukti":"data:…"}`
pub async fn set_status<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path(id): Path<String>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Student>, ApiError>
where
  S: KvStore + 'static,
{
  let evidence = body
    .evidence
    .filter(|e| !e.trim().is_empty())
    .map(Evidence::from_data_url)
    .transpose()?;
  let change = StatusChange { scope: body.scope, status: body.status, evidence };
  let student = state.segak.lock().await.set_status(&id, change).await?;
  Ok(Json(student))
}
