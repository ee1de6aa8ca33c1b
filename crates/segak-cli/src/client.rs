//! Async HTTP client wrapping the SEGAK JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Method, RequestBuilder, Response};
use segak_core::{
  backup::RestoreSummary,
  dashboard::DashboardSummary,
  report::Report,
  roster::RosterEntry,
  settings::TeacherSettings,
  student::Student,
  user::UserProfile,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

/// Connection settings for the SEGAK API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// Async HTTP client for the SEGAK JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

/// A downloaded backup file.
pub struct Download {
  pub file_name: Option<String>,
  pub contents:  String,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    tracing::debug!(%method, path, "request");
    let req = self.client.request(method, self.url(path));
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  /// Send `req`, turning a non-success status into an error that carries the
  /// server's `{"error": …}` message.
  async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
    let resp = req.send().await.with_context(|| format!("{what} failed"))?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<Value>()
      .await
      .ok()
      .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
      .unwrap_or_default();
    Err(anyhow!("{what} → {status} {message}"))
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    let what = format!("GET {path}");
    let resp = self.send(self.request(Method::GET, path), &what).await?;
    resp.json().await.with_context(|| format!("deserialising {path}"))
  }

  async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    body: &B,
  ) -> Result<T> {
    let what = format!("{method} {path}");
    let resp = self.send(self.request(method, path).json(body), &what).await?;
    resp.json().await.with_context(|| format!("deserialising {path}"))
  }

  async fn delete(&self, path: &str) -> Result<()> {
    let what = format!("DELETE {path}");
    self.send(self.request(Method::DELETE, path), &what).await?;
    Ok(())
  }

  // ── Session and year ──────────────────────────────────────────────────────

  /// `POST /api/session` with the configured credentials.
  pub async fn login(&self) -> Result<UserProfile> {
    let body = json!({ "userId": self.config.username, "password": self.config.password });
    self.send_json(Method::POST, "/session", &body).await
  }

  /// `DELETE /api/session`
  pub async fn logout(&self) -> Result<()> { self.delete("/session").await }

  /// `GET /api/year`
  pub async fn active_year(&self) -> Result<String> {
    let year: Value = self.get("/year").await?;
    year["tahun"]
      .as_str()
      .map(str::to_owned)
      .ok_or_else(|| anyhow!("malformed /year response"))
  }

  /// `PUT /api/year`
  pub async fn set_active_year(&self, year: &str) -> Result<()> {
    let _: Value = self.send_json(Method::PUT, "/year", &json!({ "tahun": year })).await?;
    Ok(())
  }

  // ── Students ──────────────────────────────────────────────────────────────

  /// `GET /api/students[?search=&form=&status=]`
  pub async fn list_students(
    &self,
    search: Option<&str>,
    form: Option<&str>,
    status: Option<&str>,
  ) -> Result<Vec<Student>> {
    let query: Vec<(&str, &str)> = [("search", search), ("form", form), ("status", status)]
      .into_iter()
      .filter_map(|(k, v)| v.map(|v| (k, v)))
      .collect();
    let resp = self
      .send(self.request(Method::GET, "/students").query(&query), "GET /students")
      .await?;
    resp.json().await.context("deserialising students")
  }

  /// `POST /api/students`
  pub async fn add_student(&self, body: &Value) -> Result<Student> {
    self.send_json(Method::POST, "/students", body).await
  }

  /// `POST /api/students/bulk/preview`
  pub async fn preview_bulk(&self, text: &str) -> Result<Vec<RosterEntry>> {
    self
      .send_json(Method::POST, "/students/bulk/preview", &json!({ "text": text }))
      .await
  }

  /// `POST /api/students/bulk`
  pub async fn commit_bulk(
    &self,
    form: &str,
    class: &str,
    year: &str,
    entries: &[RosterEntry],
  ) -> Result<Vec<Student>> {
    let body = json!({ "tingkatan": form, "kelas": class, "tahun": year, "entries": entries });
    self.send_json(Method::POST, "/students/bulk", &body).await
  }

  /// `PUT /api/students/{id}/results/{phase}`
  pub async fn record_result(&self, id: &str, phase: u8, body: &Value) -> Result<Student> {
    self
      .send_json(Method::PUT, &format!("/students/{id}/results/{phase}"), body)
      .await
  }

  /// `PUT /api/students/{id}/status`
  pub async fn set_status(&self, id: &str, body: &Value) -> Result<Student> {
    self.send_json(Method::PUT, &format!("/students/{id}/status"), body).await
  }

  /// `DELETE /api/students/{id}`
  pub async fn delete_student(&self, id: &str) -> Result<()> {
    self.delete(&format!("/students/{id}")).await
  }

  // ── Views ─────────────────────────────────────────────────────────────────

  /// `GET /api/reports?phase=&form=&class=`
  pub async fn report(&self, phase: u8, form: Option<&str>, class: Option<&str>) -> Result<Report> {
    let mut query = vec![("phase", phase.to_string())];
    query.extend(form.map(|f| ("form", f.to_owned())));
    query.extend(class.map(|c| ("class", c.to_owned())));
    let resp = self
      .send(self.request(Method::GET, "/reports").query(&query), "GET /reports")
      .await?;
    resp.json().await.context("deserialising report")
  }

  /// `GET /api/dashboard`
  pub async fn dashboard(&self) -> Result<DashboardSummary> { self.get("/dashboard").await }

  // ── Admin ─────────────────────────────────────────────────────────────────

  /// `GET /api/settings`
  pub async fn settings(&self) -> Result<TeacherSettings> { self.get("/settings").await }

  /// `PUT /api/settings`
  pub async fn save_settings(&self, settings: &TeacherSettings) -> Result<TeacherSettings> {
    self.send_json(Method::PUT, "/settings", settings).await
  }

  /// `GET /api/users`
  pub async fn users(&self) -> Result<Vec<UserProfile>> { self.get("/users").await }

  /// `POST /api/users`
  pub async fn add_user(&self, body: &Value) -> Result<UserProfile> {
    self.send_json(Method::POST, "/users", body).await
  }

  /// `DELETE /api/users/{id}`
  pub async fn delete_user(&self, id: &str) -> Result<()> {
    self.delete(&format!("/users/{id}")).await
  }

  /// `GET /api/backup`
  pub async fn backup(&self) -> Result<Download> {
    let resp = self.send(self.request(Method::GET, "/backup"), "GET /backup").await?;
    let file_name = resp
      .headers()
      .get(reqwest::header::CONTENT_DISPOSITION)
      .and_then(|v| v.to_str().ok())
      .and_then(attachment_name);
    let contents = resp.text().await.context("reading backup body")?;
    Ok(Download { file_name, contents })
  }

  /// `POST /api/backup`
  pub async fn restore(&self, contents: String) -> Result<RestoreSummary> {
    let req = self
      .request(Method::POST, "/backup")
      .header(reqwest::header::CONTENT_TYPE, "application/json")
      .body(contents);
    let resp = self.send(req, "POST /backup").await?;
    resp.json().await.context("deserialising restore summary")
  }
}

/// File name from `attachment; filename="…"`.
fn attachment_name(disposition: &str) -> Option<String> {
  let (_, rest) = disposition.split_once("filename=")?;
  Some(rest.trim().trim_matches('"').to_owned())
}
