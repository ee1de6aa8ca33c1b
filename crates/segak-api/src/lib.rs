//! JSON REST API for SEGAK.
//!
//! Exposes an axum [`Router`] over one shared [`Segak`] controller backed by
//! any [`KvStore`]. Every route except `POST /session` and `GET /options`
//! requires HTTP Basic credentials of a stored account; admin-only routes
//! answer `403` for teachers.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", segak_api::router(AppState::new(segak)))
//! ```
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` `POST` `DELETE` | `/session` | Current session, login, logout |
//! | `GET`  | `/options` | Form, class, year and status choices |
//! | `GET` `PUT` | `/year` | Active academic year |
//! | `GET` `POST` | `/students` | Active-year list with `?search&form&status`; create |
//! | `POST` | `/students/bulk/preview` | Parse pasted text; nothing is stored |
//! | `POST` | `/students/bulk` | Commit confirmed entries |
//! | `GET` `PATCH` `DELETE` | `/students/{id}` | |
//! | `PUT`  | `/students/{id}/results/{phase}` | Phase `1` or `2` |
//! | `PUT`  | `/students/{id}/status` | |
//! | `GET`  | `/reports` | `?scope=class\|form\|school&form&class&phase` |
//! | `GET`  | `/dashboard` | |
//! | `GET` `PUT` | `/settings` | `PUT` admin only |
//! | `GET` `POST` | `/users` | Admin only |
//! | `DELETE` | `/users/{id}` | Admin only |
//! | `GET` `POST` | `/backup` | Admin only; download / restore |

pub mod auth;
pub mod backup;
pub mod error;
pub mod options;
pub mod reports;
pub mod session;
pub mod settings;
pub mod students;
pub mod users;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use segak_core::{
  Policy, Segak, app::DEFAULT_ADMIN_PASSWORD, backup::RestoreMode, status::EvidencePolicy,
  store::KvStore,
};
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `segak.toml` and
/// `SEGAK_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  #[serde(default = "default_store_path")]
  pub store_path:       PathBuf,
  /// Reject exemption statuses that come without an evidence attachment.
  #[serde(default = "default_true")]
  pub require_evidence: bool,
  #[serde(default)]
  pub restore_mode:     RestoreMode,
  /// Initial password of the seed admin; plaintext or an argon2 PHC string.
  #[serde(default = "default_admin_password")]
  pub admin_password:   String,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/segak/segak.db") }
fn default_true() -> bool { true }
fn default_admin_password() -> String { DEFAULT_ADMIN_PASSWORD.into() }

impl ServerConfig {
  pub fn policy(&self) -> Policy {
    Policy {
      evidence:            if self.require_evidence {
        EvidencePolicy::Required
      } else {
        EvidencePolicy::Optional
      },
      restore:             self.restore_mode,
      seed_admin_password: self.admin_password.clone(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
///
/// Mutations are serialised through the mutex, so each one sees and persists
/// a consistent snapshot.
pub struct AppState<S> {
  pub segak: Arc<Mutex<Segak<S>>>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self { Self { segak: Arc::clone(&self.segak) } }
}

impl<S: KvStore> AppState<S> {
  pub fn new(segak: Segak<S>) -> Self { Self { segak: Arc::new(Mutex::new(segak)) } }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: KvStore + 'static,
{
  Router::new()
    // Session
    .route(
      "/session",
      get(session::current::<S>)
        .post(session::login::<S>)
        .delete(session::logout::<S>),
    )
    .route("/options", get(options::handler))
    .route("/year", get(settings::get_year::<S>).put(settings::set_year::<S>))
    // Students
    .route("/students", get(students::list::<S>).post(students::create::<S>))
    .route("/students/bulk/preview", post(students::bulk_preview::<S>))
    .route("/students/bulk", post(students::bulk_commit::<S>))
    .route(
      "/students/{id}",
      get(students::get_one::<S>)
        .patch(students::update::<S>)
        .delete(students::remove::<S>),
    )
    .route("/students/{id}/results/{phase}", put(students::record_result::<S>))
    .route("/students/{id}/status", put(students::set_status::<S>))
    // Views
    .route("/reports", get(reports::report::<S>))
    .route("/dashboard", get(reports::dashboard::<S>))
    // Admin
    .route("/settings", get(settings::get_settings::<S>).put(settings::save_settings::<S>))
    .route("/users", get(users::list::<S>).post(users::create::<S>))
    .route("/users/{id}", delete(users::remove::<S>))
    .route("/backup", get(backup::export::<S>).post(backup::restore::<S>))
    .with_state(state)
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use segak_core::store::MemoryStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  const ADMIN: (&str, &str) = ("admin", DEFAULT_ADMIN_PASSWORD);

  async fn make_state() -> AppState<MemoryStore> {
    AppState::new(Segak::open(MemoryStore::new(), Policy::default()).await.unwrap())
  }

  struct Reply {
    status:  StatusCode,
    headers: HeaderMap,
    body:    Value,
  }

  async fn send(
    state: &AppState<MemoryStore>,
    method: Method,
    uri: &str,
    auth: Option<(&str, &str)>,
    body: Option<Value>,
  ) -> Reply {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some((user, pass)) = auth {
      let encoded = B64.encode(format!("{user}:{pass}"));
      req = req.header(header::AUTHORIZATION, format!("Basic {encoded}"));
    }
    let req = match body {
      Some(body) => req
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => req.body(Body::empty()).unwrap(),
    };

    let resp = router(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Reply { status, headers, body }
  }

  async fn add_student(state: &AppState<MemoryStore>, name: &str, class: &str) -> String {
    let reply = send(
      state,
      Method::POST,
      "/students",
      Some(ADMIN),
      Some(json!({
        "nama": name, "ic": "080101015543", "jantina": "Lelaki",
        "tingkatan": "3", "kelas": class, "tahun": "2025"
      })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    reply.body["id"].as_str().unwrap().to_owned()
  }

  async fn use_year_2025(state: &AppState<MemoryStore>) {
    let reply =
      send(state, Method::PUT, "/year", Some(ADMIN), Some(json!({ "tahun": "2025" }))).await;
    assert_eq!(reply.status, StatusCode::OK);
  }

  // ─── Auth ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn requests_without_credentials_are_challenged() {
    let state = make_state().await;
    let reply = send(&state, Method::GET, "/students", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.headers.contains_key(header::WWW_AUTHENTICATE));
    assert!(reply.body["error"].is_string());
  }

  #[tokio::test]
  async fn options_need_no_credentials() {
    let state = make_state().await;
    let reply = send(&state, Method::GET, "/options", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["kelas"]["4"], json!(["ST", "A", "B", "C", "D"]));
  }

  #[tokio::test]
  async fn login_and_logout() {
    let state = make_state().await;
    let body = json!({ "userId": "admin", "password": "salah" });
    let reply = send(&state, Method::POST, "/session", None, Some(body)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let body = json!({ "userId": "admin", "password": DEFAULT_ADMIN_PASSWORD });
    let reply = send(&state, Method::POST, "/session", None, Some(body)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["role"], "Admin");

    let reply = send(&state, Method::GET, "/session", Some(ADMIN), None).await;
    assert_eq!(reply.body["userId"], "admin");

    let reply = send(&state, Method::DELETE, "/session", Some(ADMIN), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    let reply = send(&state, Method::GET, "/session", Some(ADMIN), None).await;
    assert_eq!(reply.body, Value::Null);
  }

  // ─── Students ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_list_and_search_students() {
    let state = make_state().await;
    use_year_2025(&state).await;
    add_student(&state, "ahmad bin ali", "A").await;
    add_student(&state, "siti aminah", "B").await;

    let reply = send(&state, Method::GET, "/students", Some(ADMIN), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.as_array().unwrap().len(), 2);
    assert_eq!(reply.body[0]["fasa"]["1"]["view"]["kind"], "entry");

    let reply = send(&state, Method::GET, "/students?search=siti", Some(ADMIN), None).await;
    let list = reply.body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["nama"], "SITI AMINAH");
  }

  #[tokio::test]
  async fn bulk_preview_then_commit() {
    let state = make_state().await;
    let text = "ALI BIN ABU\t080101015543\nSITI\t080202025544\tP\nrosak";
    let reply = send(
      &state,
      Method::POST,
      "/students/bulk/preview",
      Some(ADMIN),
      Some(json!({ "text": text })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let entries = reply.body.clone();
    assert_eq!(entries.as_array().unwrap().len(), 2);
    assert_eq!(entries[1]["jantina"], "Perempuan");

    let reply = send(
      &state,
      Method::POST,
      "/students/bulk",
      Some(ADMIN),
      Some(json!({ "tingkatan": "4", "kelas": "ST", "tahun": "2025", "entries": entries })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body[0]["namaGuruPJPK"], "GURU PJPK");
    assert_eq!(reply.body[1]["kelas"], "ST");
  }

  #[tokio::test]
  async fn record_result_and_exempt_phase() {
    let state = make_state().await;
    use_year_2025(&state).await;
    let id = add_student(&state, "ahmad", "A").await;

    let result = json!({ "tinggi": 160, "berat": 64, "tekanTubi": 55 });
    let uri = format!("/students/{id}/results/1");
    let reply = send(&state, Method::PUT, &uri, Some(ADMIN), Some(result.clone())).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["fasa1"]["bmi"], 25.0);
    assert_eq!(reply.body["fasa1"]["tekanTubi"], 40);

    let reply = send(&state, Method::PUT, &format!("/students/{id}/results/3"), Some(ADMIN), Some(result.clone())).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let uri = format!("/students/{id}/status");
    let change = json!({ "scope": "fasa2", "status": "Masalah Kesihatan" });
    let reply = send(&state, Method::PUT, &uri, Some(ADMIN), Some(change)).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);

    let change = json!({
      "scope": "fasa2", "status": "Masalah Kesihatan",
      "suratBukti": "data:image/png;base64,c3VyYXQ="
    });
    let reply = send(&state, Method::PUT, &uri, Some(ADMIN), Some(change)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["statusFasa2"], "Masalah Kesihatan");

    let uri = format!("/students/{id}/results/2");
    let reply = send(&state, Method::PUT, &uri, Some(ADMIN), Some(result)).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = send(&state, Method::GET, &format!("/students/{id}"), Some(ADMIN), None).await;
    assert_eq!(reply.body["fasa"]["2"]["view"]["kind"], "exempt");
    assert_eq!(reply.body["fasa"]["1"]["kategoriBmi"], "Berlebihan Berat Badan");
  }

  #[tokio::test]
  async fn update_and_delete_student() {
    let state = make_state().await;
    let id = add_student(&state, "ahmad", "A").await;
    let uri = format!("/students/{id}");

    let reply = send(&state, Method::PATCH, &uri, Some(ADMIN), Some(json!({ "kelas": "C" }))).await;
    assert_eq!(reply.body["kelas"], "C");

    let reply = send(&state, Method::DELETE, &uri, Some(ADMIN), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    let reply = send(&state, Method::GET, &uri, Some(ADMIN), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
  }

  // ─── Views ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn class_report_and_dashboard() {
    let state = make_state().await;
    use_year_2025(&state).await;
    add_student(&state, "zainal", "A").await;
    add_student(&state, "ahmad", "A").await;
    add_student(&state, "bala", "B").await;

    let reply = send(
      &state,
      Method::GET,
      "/reports?scope=class&form=3&class=A&phase=1",
      Some(ADMIN),
      None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["title"], "LAPORAN ANALISIS UJIAN SEGAK - FASA 1");
    assert_eq!(reply.body["file_name"], "LAPORAN_SEGAK_Fasa1_3A.pdf");
    let rows = reply.body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "AHMAD");

    let reply = send(&state, Method::GET, "/reports?scope=class&phase=1", Some(ADMIN), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = send(&state, Method::GET, "/dashboard", Some(ADMIN), None).await;
    assert_eq!(reply.body["total"], 3);
    assert_eq!(reply.body["phase1"]["pending"], 3);
  }

  // ─── Admin ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn teachers_are_forbidden_admin_routes() {
    let state = make_state().await;
    let new_user = json!({ "name": "Cikgu Aminah", "userId": "aminah", "password": "rahsia" });
    let reply = send(&state, Method::POST, "/users", Some(ADMIN), Some(new_user)).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["role"], "Guru");

    let teacher = Some(("aminah", "rahsia"));
    for (method, uri) in [(Method::GET, "/users"), (Method::GET, "/backup")] {
      let reply = send(&state, method, uri, teacher, None).await;
      assert_eq!(reply.status, StatusCode::FORBIDDEN, "{uri}");
    }
    let reply = send(&state, Method::PUT, "/settings", teacher, Some(json!({}))).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = send(&state, Method::GET, "/settings", teacher, None).await;
    assert_eq!(reply.status, StatusCode::OK);
  }

  #[tokio::test]
  async fn admin_accounts_cannot_be_deleted() {
    let state = make_state().await;
    let reply = send(&state, Method::DELETE, "/users/admin-1", Some(ADMIN), None).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    let reply = send(&state, Method::GET, "/users", Some(ADMIN), None).await;
    assert_eq!(reply.body.as_array().unwrap().len(), 1);
    assert!(reply.body[0].get("passwordHash").is_none());
  }

  #[tokio::test]
  async fn backup_download_and_restore() {
    let state = make_state().await;
    add_student(&state, "ahmad", "A").await;

    let reply = send(&state, Method::GET, "/backup", Some(ADMIN), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let disposition = reply.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("backup_segak_"));
    let backup = reply.body.clone();
    assert_eq!(backup.as_array().unwrap().len(), 1);

    let reply = send(&state, Method::POST, "/backup", Some(ADMIN), Some(json!({ "not": "array" }))).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);

    add_student(&state, "siti", "A").await;
    let reply = send(&state, Method::POST, "/backup", Some(ADMIN), Some(backup)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["restored"], 1);
  }
}
