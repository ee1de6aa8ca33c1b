//! The application controller.
//!
//! [`Segak`] owns every collection in memory and writes the affected
//! collection back to its [`KvStore`] after each mutation. A mutation is
//! built on a copy and only becomes visible once the write succeeded, so a
//! failed save leaves both memory and the store as they were.

use chrono::{Datelike, Local};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use crate::{
  Error, Result, auth,
  backup::{self, Backup, RestoreMode, RestoreSummary},
  dashboard::{self, DashboardSummary},
  report::{self, Report, ReportRequest},
  roster::{self, BulkMeta, FALLBACK_TEACHER, RosterEntry, StudentFilter},
  settings::TeacherSettings,
  status::{self, EvidencePolicy, PhaseView, StatusChange},
  store::{KvStore, keys},
  student::{NewStudent, Phase, Student, StudentUpdate, TestResult, TestResultInput},
  user::{NewUser, Role, User, UserProfile},
};

/// Seed administrator password used when none is configured.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin5068";

/// Behaviour switches chosen at deployment time.
#[derive(Debug, Clone)]
pub struct Policy {
  pub evidence:            EvidencePolicy,
  pub restore:             RestoreMode,
  /// Password given to the seed administrator when no admin exists.
  pub seed_admin_password: String,
}

impl Default for Policy {
  fn default() -> Self {
    Self {
      evidence:            EvidencePolicy::default(),
      restore:             RestoreMode::default(),
      seed_admin_password: DEFAULT_ADMIN_PASSWORD.to_owned(),
    }
  }
}

/// Everything the application keeps, loaded once at start.
#[derive(Debug, Clone)]
struct State {
  students:    Vec<Student>,
  users:       Vec<User>,
  settings:    TeacherSettings,
  active_year: String,
  session:     Option<UserProfile>,
}

pub struct Segak<S> {
  store:  S,
  policy: Policy,
  state:  State,
}

impl<S: KvStore> Segak<S> {
  /// Load all collections from `store`, filling in defaults for anything
  /// missing. Creates the seed administrator when no admin account exists.
  pub async fn open(store: S, policy: Policy) -> Result<Self> {
    let mut users: Vec<User> = load(&store, keys::USERS).await?.unwrap_or_default();
    let mut users_dirty = false;
    for user in &mut users {
      users_dirty |= user.upgrade_password()?;
    }
    if !users.iter().any(User::is_admin) {
      info!("no admin account found, creating seed admin");
      users.insert(0, User::seed_admin(&policy.seed_admin_password)?);
      users_dirty = true;
    }

    let students: Vec<Student> = load(&store, keys::STUDENTS).await?.unwrap_or_default();
    let settings = load(&store, keys::SETTINGS).await?.unwrap_or_default();
    // Stored as a bare string, not JSON.
    let active_year = store
      .get(keys::ACTIVE_YEAR)
      .await
      .map_err(store_error)?
      .map(|y| y.trim().trim_matches('"').to_owned())
      .filter(|y| !y.is_empty())
      .unwrap_or_else(|| Local::now().year().to_string());
    let session = load(&store, keys::SESSION).await?;

    let app = Self {
      store,
      policy,
      state: State { students, users, settings, active_year, session },
    };
    if users_dirty {
      app.persist(keys::USERS, &app.state.users).await?;
    }
    info!(
      students = app.state.students.len(),
      users = app.state.users.len(),
      year = %app.state.active_year,
      "loaded application state"
    );
    Ok(app)
  }

  pub fn policy(&self) -> &Policy { &self.policy }

  /// Give back the underlying store.
  pub fn into_store(self) -> S { self.store }

  // ─── Session ─────────────────────────────────────────────────────────────

  /// Check credentials without touching the session.
  pub fn authenticate(&self, login_id: &str, password: &str) -> Result<UserProfile> {
    self
      .credentials(login_id)
      .filter(|(_, hash)| auth::verify_password(password, hash))
      .map(|(profile, _)| profile)
      .ok_or(Error::InvalidCredentials)
  }

  /// The account under `login_id` with its stored password hash, so callers
  /// can verify a password without borrowing the controller.
  pub fn credentials(&self, login_id: &str) -> Option<(UserProfile, String)> {
    let login_id = login_id.trim().to_lowercase();
    self
      .state
      .users
      .iter()
      .find(|u| u.login_id == login_id)
      .map(|u| (u.profile(), u.password_hash.clone()))
  }

  /// Check credentials and persist the resulting session.
  pub async fn login(&mut self, login_id: &str, password: &str) -> Result<UserProfile> {
    let profile = match self.authenticate(login_id, password) {
      Ok(profile) => profile,
      Err(e) => {
        warn!(login_id, "login failed");
        return Err(e);
      }
    };
    self.persist(keys::SESSION, &profile).await?;
    info!(login_id = %profile.login_id, role = %profile.role, "logged in");
    self.state.session = Some(profile.clone());
    Ok(profile)
  }

  pub async fn logout(&mut self) -> Result<()> {
    self.store.remove(keys::SESSION).await.map_err(store_error)?;
    if let Some(profile) = self.state.session.take() {
      info!(login_id = %profile.login_id, "logged out");
    }
    Ok(())
  }

  pub fn session(&self) -> Option<&UserProfile> { self.state.session.as_ref() }

  // ─── Active year ─────────────────────────────────────────────────────────

  pub fn active_year(&self) -> &str { &self.state.active_year }

  pub async fn set_active_year(&mut self, year: &str) -> Result<()> {
    let year = year.trim();
    if year.is_empty() {
      return Err(Error::MissingField("tahun"));
    }
    self
      .store
      .put(keys::ACTIVE_YEAR, year.to_owned())
      .await
      .map_err(store_error)?;
    info!(year, "active year changed");
    self.state.active_year = year.to_owned();
    Ok(())
  }

  // ─── Students: queries ───────────────────────────────────────────────────

  /// Every student of every year.
  pub fn all_students(&self) -> &[Student] { &self.state.students }

  /// Students of the active year.
  pub fn students(&self) -> impl Iterator<Item = &Student> {
    let year = self.state.active_year.as_str();
    self.state.students.iter().filter(move |s| s.year == year)
  }

  pub fn search_students(&self, filter: &StudentFilter) -> Vec<&Student> {
    self.students().filter(|s| filter.matches(s)).collect()
  }

  pub fn student(&self, id: &str) -> Result<&Student> {
    self
      .state
      .students
      .iter()
      .find(|s| s.id == id)
      .ok_or_else(|| Error::StudentNotFound(id.to_owned()))
  }

  pub fn phase_view(&self, id: &str, phase: Phase) -> Result<PhaseView> {
    Ok(status::phase_view(self.student(id)?, phase))
  }

  /// Default assigned teacher for new students.
  fn default_teacher(&self) -> &str {
    match self.state.settings.teacher_name.trim() {
      "" => FALLBACK_TEACHER,
      name => name,
    }
  }

  // ─── Students: mutations ─────────────────────────────────────────────────

  pub async fn add_student(&mut self, new: NewStudent) -> Result<Student> {
    let student = new.into_student(self.default_teacher())?;
    let mut students = self.state.students.clone();
    students.push(student.clone());
    self.commit_students(students).await?;
    info!(id = %student.id, name = %student.name, "student added");
    Ok(student)
  }

  /// Add every entry of a confirmed bulk import under one class placement.
  pub async fn add_students_bulk(
    &mut self,
    entries: Vec<RosterEntry>,
    meta: &BulkMeta,
  ) -> Result<Vec<Student>> {
    let teacher = self.default_teacher().to_owned();
    let added: Vec<Student> = entries
      .into_iter()
      .map(|e| e.into_new_student(meta, &teacher).build(&teacher))
      .collect();

    let mut students = self.state.students.clone();
    students.extend(added.iter().cloned());
    self.commit_students(students).await?;
    info!(
      count = added.len(),
      form = %meta.form,
      class = %meta.class,
      year = %meta.year,
      "bulk import committed"
    );
    Ok(added)
  }

  /// Parse pasted text and commit every detected entry.
  pub async fn import_roster(&mut self, text: &str, meta: &BulkMeta) -> Result<Vec<Student>> {
    self.add_students_bulk(roster::parse_bulk(text), meta).await
  }

  pub async fn update_student(&mut self, id: &str, update: StudentUpdate) -> Result<Student> {
    let student = self.modify_student(id, |s| update.apply(s)).await?;
    info!(id, "student updated");
    Ok(student)
  }

  pub async fn delete_student(&mut self, id: &str) -> Result<Student> {
    let mut students = self.state.students.clone();
    let index = students
      .iter()
      .position(|s| s.id == id)
      .ok_or_else(|| Error::StudentNotFound(id.to_owned()))?;
    let removed = students.remove(index);
    self.commit_students(students).await?;
    info!(id, name = %removed.name, "student deleted");
    Ok(removed)
  }

  /// Store the measurements for one phase, replacing any earlier result.
  pub async fn record_result(
    &mut self,
    id: &str,
    phase: Phase,
    input: TestResultInput,
  ) -> Result<Student> {
    let student = self
      .modify_student(id, |s| {
        status::ensure_recordable(s, phase)?;
        *s.result_slot(phase) = Some(TestResult::from_input(input));
        s.touch();
        Ok(())
      })
      .await?;
    info!(id, %phase, "result recorded");
    Ok(student)
  }

  pub async fn set_status(&mut self, id: &str, change: StatusChange) -> Result<Student> {
    let policy = self.policy.evidence;
    let scope = change.scope;
    let new_status = change.status;
    let student = self
      .modify_student(id, |s| status::apply(s, change, policy))
      .await
      .inspect_err(|e| warn!(id, error = %e, "status change rejected"))?;
    info!(id, ?scope, status = %new_status, "status changed");
    Ok(student)
  }

  // ─── Views ───────────────────────────────────────────────────────────────

  /// Report over the active year's students.
  pub fn report(&self, request: &ReportRequest) -> Report {
    report::generate(self.students(), request, &self.state.settings)
  }

  pub fn dashboard(&self) -> DashboardSummary { dashboard::summarize(self.students()) }

  // ─── Settings (admin) ────────────────────────────────────────────────────

  pub fn settings(&self) -> &TeacherSettings { &self.state.settings }

  pub async fn save_settings(
    &mut self,
    actor: &UserProfile,
    settings: TeacherSettings,
  ) -> Result<TeacherSettings> {
    actor.require(Role::Admin)?;
    let settings = settings.normalized();
    self.persist(keys::SETTINGS, &settings).await?;
    info!(by = %actor.login_id, "settings saved");
    self.state.settings = settings.clone();
    Ok(settings)
  }

  // ─── Users (admin) ───────────────────────────────────────────────────────

  pub fn users(&self, actor: &UserProfile) -> Result<Vec<UserProfile>> {
    actor.require(Role::Admin)?;
    Ok(self.state.users.iter().map(User::profile).collect())
  }

  pub async fn add_user(&mut self, actor: &UserProfile, new: NewUser) -> Result<UserProfile> {
    actor.require(Role::Admin)?;
    let user = new.into_user()?;
    if self.state.users.iter().any(|u| u.login_id == user.login_id) {
      return Err(Error::DuplicateLogin(user.login_id));
    }
    let profile = user.profile();
    let mut users = self.state.users.clone();
    users.push(user);
    self.persist(keys::USERS, &users).await?;
    self.state.users = users;
    info!(by = %actor.login_id, login_id = %profile.login_id, role = %profile.role, "user added");
    Ok(profile)
  }

  /// Remove a teacher account. Admin accounts are never deleted.
  pub async fn delete_user(&mut self, actor: &UserProfile, id: &str) -> Result<()> {
    actor.require(Role::Admin)?;
    let index = self
      .state
      .users
      .iter()
      .position(|u| u.id == id)
      .ok_or_else(|| Error::UserNotFound(id.to_owned()))?;
    if self.state.users[index].is_admin() {
      warn!(by = %actor.login_id, id, "refused to delete admin account");
      return Err(Error::ProtectedAdmin);
    }

    let mut users = self.state.users.clone();
    let removed = users.remove(index);
    self.persist(keys::USERS, &users).await?;
    self.state.users = users;
    info!(by = %actor.login_id, login_id = %removed.login_id, "user deleted");

    if self.state.session.as_ref().is_some_and(|p| p.id == removed.id) {
      self.logout().await?;
    }
    Ok(())
  }

  // ─── Backup (admin) ──────────────────────────────────────────────────────

  /// Serialise every student of every year.
  pub fn export_backup(&self, actor: &UserProfile) -> Result<Backup> {
    actor.require(Role::Admin)?;
    let backup = backup::export(&self.state.students, Local::now().date_naive())?;
    info!(by = %actor.login_id, students = self.state.students.len(), "backup exported");
    Ok(backup)
  }

  /// Replace the whole student collection with the contents of a backup
  /// file. On any error nothing changes.
  pub async fn restore_backup(&mut self, actor: &UserProfile, text: &str) -> Result<RestoreSummary> {
    actor.require(Role::Admin)?;
    let restored = backup::parse(text, self.policy.restore)
      .inspect_err(|e| warn!(by = %actor.login_id, error = %e, "restore rejected"))?;
    for skipped in &restored.skipped {
      warn!(%skipped, "restore skipped malformed record");
    }

    let summary = RestoreSummary {
      restored: restored.students.len(),
      skipped:  restored.skipped,
    };
    self.commit_students(restored.students).await?;
    info!(
      by = %actor.login_id,
      restored = summary.restored,
      skipped = summary.skipped.len(),
      "backup restored"
    );
    Ok(summary)
  }

  // ─── Persistence ─────────────────────────────────────────────────────────

  async fn persist<T: Serialize + ?Sized>(&self, key: &'static str, value: &T) -> Result<()> {
    let blob = serde_json::to_string(value)?;
    debug!(key, bytes = blob.len(), "persisting");
    self.store.put(key, blob).await.map_err(store_error)
  }

  async fn commit_students(&mut self, students: Vec<Student>) -> Result<()> {
    self.persist(keys::STUDENTS, &students).await?;
    self.state.students = students;
    Ok(())
  }

  /// Run `edit` on a copy of one student and commit the result.
  async fn modify_student<F>(&mut self, id: &str, edit: F) -> Result<Student>
  where
    F: FnOnce(&mut Student) -> Result<()>,
  {
    let mut students = self.state.students.clone();
    let student = students
      .iter_mut()
      .find(|s| s.id == id)
      .ok_or_else(|| Error::StudentNotFound(id.to_owned()))?;
    edit(student)?;
    let updated = student.clone();
    self.commit_students(students).await?;
    Ok(updated)
  }
}

async fn load<S: KvStore, T: DeserializeOwned>(store: &S, key: &str) -> Result<Option<T>> {
  match store.get(key).await.map_err(store_error)? {
    Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
    None => Ok(None),
  }
}

fn store_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> Error {
  Error::Store(Box::new(e))
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::{
    status::StatusScope,
    store::MemoryStore,
    student::{Evidence, Gender, StudentStatus},
    user::SEED_ADMIN_ID,
  };

  async fn open() -> Segak<MemoryStore> {
    Segak::open(MemoryStore::new(), Policy::default()).await.unwrap()
  }

  async fn admin(app: &mut Segak<MemoryStore>) -> UserProfile {
    app.login("admin", DEFAULT_ADMIN_PASSWORD).await.unwrap()
  }

  fn new_student(name: &str, year: &str) -> NewStudent {
    NewStudent {
      name: name.into(),
      ic: "080101-01-5543".into(),
      gender: Gender::Male,
      form: "3".into(),
      class: "A".into(),
      year: year.into(),
      teacher: None,
    }
  }

  fn teacher(login: &str) -> NewUser {
    NewUser {
      name:     "Cikgu Aminah".into(),
      login_id: login.into(),
      password: "rahsia".into(),
      role:     Role::Teacher,
    }
  }

  fn evidence() -> Evidence { Evidence::from_bytes("image/png", b"surat") }

  #[tokio::test]
  async fn first_start_seeds_admin_and_defaults() {
    let app = open().await;
    assert_eq!(app.state.users.len(), 1);
    assert_eq!(app.state.users[0].id, SEED_ADMIN_ID);
    assert_eq!(app.active_year(), Local::now().year().to_string());
    assert_eq!(app.settings(), &TeacherSettings::default());
    assert!(app.session().is_none());
    assert!(app.store.raw(keys::USERS).is_some());
  }

  #[tokio::test]
  async fn login_persists_session_and_logout_clears_it() {
    let mut app = open().await;
    let profile = app.login(" ADMIN ", DEFAULT_ADMIN_PASSWORD).await.unwrap();
    assert_eq!(profile.role, Role::Admin);
    assert!(app.store.raw(keys::SESSION).is_some());

    let app = Segak::open(app.into_store(), Policy::default()).await.unwrap();
    assert_eq!(app.session().map(|p| p.id.as_str()), Some(SEED_ADMIN_ID));

    let mut app = app;
    app.logout().await.unwrap();
    assert!(app.session().is_none());
    assert!(app.store.raw(keys::SESSION).is_none());
  }

  #[tokio::test]
  async fn wrong_password_is_rejected() {
    let mut app = open().await;
    assert!(matches!(app.login("admin", "salah").await, Err(Error::InvalidCredentials)));
    assert!(matches!(app.login("tiada", "salah").await, Err(Error::InvalidCredentials)));
    assert!(app.session().is_none());
  }

  #[tokio::test]
  async fn students_are_scoped_to_active_year() {
    let mut app = open().await;
    app.set_active_year("2025").await.unwrap();
    app.add_student(new_student("ahmad", "2025")).await.unwrap();
    app.add_student(new_student("siti", "2026")).await.unwrap();

    let names: Vec<_> = app.students().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["AHMAD"]);
    assert_eq!(app.all_students().len(), 2);
    assert_eq!(app.dashboard().total, 1);

    app.set_active_year("2026").await.unwrap();
    assert_eq!(app.store.raw(keys::ACTIVE_YEAR).as_deref(), Some("2026"));
    let names: Vec<_> = app.students().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["SITI"]);
  }

  #[tokio::test]
  async fn new_students_get_the_configured_teacher() {
    let mut app = open().await;
    let added = app.add_student(new_student("ahmad", "2025")).await.unwrap();
    assert_eq!(added.teacher, FALLBACK_TEACHER);
    assert_eq!(added.ic, "080101015543");

    let actor = admin(&mut app).await;
    let settings = TeacherSettings { teacher_name: "cikgu razak".into(), ..Default::default() };
    app.save_settings(&actor, settings).await.unwrap();
    let added = app.add_student(new_student("siti", "2025")).await.unwrap();
    assert_eq!(added.teacher, "CIKGU RAZAK");
  }

  #[tokio::test]
  async fn bulk_import_commits_every_entry() {
    let mut app = open().await;
    let meta = BulkMeta { form: "4".into(), class: "ST".into(), year: "2025".into() };
    let added = app
      .import_roster("ALI BIN ABU\t080101015543\nSITI AMINAH, 080202025544\n\nlone", &meta)
      .await
      .unwrap();
    assert_eq!(added.len(), 2);
    assert!(added.iter().all(|s| s.form == "4" && s.class == "ST" && s.year == "2025"));
    assert_eq!(added[1].gender, Gender::Female);
    assert_ne!(added[0].id, added[1].id);

    let stored: Vec<Student> =
      serde_json::from_str(&app.store.raw(keys::STUDENTS).unwrap()).unwrap();
    assert_eq!(stored, added);
  }

  #[tokio::test]
  async fn credentials_expose_profile_and_hash() {
    let app = open().await;
    let (profile, hash) = app.credentials(" ADMIN ").unwrap();
    assert_eq!(profile.id, SEED_ADMIN_ID);
    assert!(auth::verify_password(DEFAULT_ADMIN_PASSWORD, &hash));
    assert!(app.credentials("nobody").is_none());
    assert!(matches!(app.authenticate("admin", "salah"), Err(Error::InvalidCredentials)));
  }

  #[tokio::test]
  async fn bulk_import_keeps_lines_without_id_digits() {
    let mut app = open().await;
    let meta = BulkMeta { form: "1".into(), class: "A".into(), year: "2025".into() };
    let entries = roster::parse_bulk("ALI BIN ABU\t080101015543\nSITI\tN/A\nAMIN\t080303035551");
    assert_eq!(entries.len(), 3);

    let added = app.add_students_bulk(entries, &meta).await.unwrap();
    assert_eq!(added.len(), 3);
    assert_eq!(added[1].name, "SITI");
    assert_eq!(added[1].ic, "");
    assert_eq!(app.all_students().len(), 3);

    let single = NewStudent { ic: "N/A".into(), ..new_student("siti", "2025") };
    let err = app.add_student(single).await.unwrap_err();
    assert!(matches!(err, Error::MissingField("ic")));
  }

  #[tokio::test]
  async fn recording_results_derives_bmi_and_clamps() {
    let mut app = open().await;
    let id = app.add_student(new_student("ahmad", "2025")).await.unwrap().id;
    let input = TestResultInput {
      date: NaiveDate::from_ymd_opt(2025, 3, 15),
      height_cm: 160.0,
      weight_kg: 64.0,
      step_test: 90,
      push_ups: 55,
      partial_curl_ups: 30,
      sit_and_reach: 30.0,
    };
    let student = app.record_result(&id, Phase::One, input).await.unwrap();
    let result = student.phase1.unwrap();
    assert_eq!(result.bmi, 25.0);
    assert_eq!(result.push_ups, 40);
    assert_eq!(result.partial_curl_ups, 25);
    assert!(student.phase2.is_none());
  }

  #[tokio::test]
  async fn exempt_phase_refuses_results() {
    let mut app = open().await;
    let id = app.add_student(new_student("ahmad", "2025")).await.unwrap().id;
    let change = StatusChange {
      scope:    StatusScope::Fasa2,
      status:   StudentStatus::HealthIssue,
      evidence: Some(evidence()),
    };
    app.set_status(&id, change).await.unwrap();

    let err = app.record_result(&id, Phase::Two, TestResultInput::default()).await.unwrap_err();
    assert!(matches!(err, Error::PhaseNotActive { phase: Phase::Two, .. }));
    app.record_result(&id, Phase::One, TestResultInput::default()).await.unwrap();
    assert!(matches!(app.phase_view(&id, Phase::Two).unwrap(), PhaseView::Exempt { .. }));
  }

  #[tokio::test]
  async fn status_without_evidence_follows_policy() {
    let mut app = open().await;
    let id = app.add_student(new_student("ahmad", "2025")).await.unwrap().id;
    let change = StatusChange {
      scope:    StatusScope::Kekal,
      status:   StudentStatus::TransferredOut,
      evidence: None,
    };
    let err = app.set_status(&id, change.clone()).await.unwrap_err();
    assert!(matches!(err, Error::EvidenceRequired(StudentStatus::TransferredOut)));
    assert!(app.student(&id).unwrap().status.is_active());

    let policy = Policy { evidence: EvidencePolicy::Optional, ..Policy::default() };
    let mut app = Segak::open(app.into_store(), policy).await.unwrap();
    let student = app.set_status(&id, change).await.unwrap();
    assert_eq!(student.status, StudentStatus::TransferredOut);
  }

  #[tokio::test]
  async fn update_and_delete_students() {
    let mut app = open().await;
    let id = app.add_student(new_student("ahmad", "2025")).await.unwrap().id;
    let update = StudentUpdate { name: Some("ahmad bin ali".into()), ..Default::default() };
    assert_eq!(app.update_student(&id, update).await.unwrap().name, "AHMAD BIN ALI");

    app.delete_student(&id).await.unwrap();
    assert!(matches!(app.student(&id), Err(Error::StudentNotFound(_))));
    assert!(matches!(app.delete_student(&id).await, Err(Error::StudentNotFound(_))));
  }

  #[tokio::test]
  async fn admin_only_operations_reject_teachers() {
    let mut app = open().await;
    let actor = admin(&mut app).await;
    app.add_user(&actor, teacher("aminah")).await.unwrap();
    let guru = app.login("aminah", "rahsia").await.unwrap();

    assert!(matches!(app.users(&guru), Err(Error::Forbidden { required: Role::Admin })));
    assert!(matches!(app.export_backup(&guru), Err(Error::Forbidden { .. })));
    assert!(matches!(
      app.save_settings(&guru, TeacherSettings::default()).await,
      Err(Error::Forbidden { .. })
    ));
    assert!(matches!(app.restore_backup(&guru, "[]").await, Err(Error::Forbidden { .. })));
    assert!(matches!(app.add_user(&guru, teacher("x")).await, Err(Error::Forbidden { .. })));
  }

  #[tokio::test]
  async fn user_management_rules() {
    let mut app = open().await;
    let actor = admin(&mut app).await;
    let guru = app.add_user(&actor, teacher("Aminah")).await.unwrap();
    assert_eq!(guru.login_id, "aminah");
    assert!(matches!(
      app.add_user(&actor, teacher("aminah")).await,
      Err(Error::DuplicateLogin(_))
    ));

    assert!(matches!(app.delete_user(&actor, SEED_ADMIN_ID).await, Err(Error::ProtectedAdmin)));
    assert!(matches!(app.delete_user(&actor, "nope").await, Err(Error::UserNotFound(_))));
    app.delete_user(&actor, &guru.id).await.unwrap();
    assert_eq!(app.users(&actor).unwrap().len(), 1);
    assert!(app.authenticate("aminah", "rahsia").is_err());
  }

  #[tokio::test]
  async fn backup_covers_all_years_and_restore_replaces() {
    let mut app = open().await;
    let actor = admin(&mut app).await;
    app.add_student(new_student("ahmad", "2025")).await.unwrap();
    app.add_student(new_student("siti", "2030")).await.unwrap();

    let backup = app.export_backup(&actor).unwrap();
    assert!(backup.file_name.starts_with("backup_segak_"));
    let exported: Vec<Student> = serde_json::from_str(&backup.contents).unwrap();
    assert_eq!(exported.len(), 2);

    app.add_student(new_student("ali", "2025")).await.unwrap();
    let summary = app.restore_backup(&actor, &backup.contents).await.unwrap();
    assert_eq!(summary.restored, 2);
    assert_eq!(app.all_students(), exported.as_slice());
  }

  #[tokio::test]
  async fn failed_restore_changes_nothing() {
    let mut app = open().await;
    let actor = admin(&mut app).await;
    app.add_student(new_student("ahmad", "2025")).await.unwrap();
    let before = app.store.raw(keys::STUDENTS);

    let err = app.restore_backup(&actor, "bukan json").await.unwrap_err();
    assert!(matches!(err, Error::InvalidRestore(_)));
    let err = app.restore_backup(&actor, r#"[{"nama": "TANPA ID"}]"#).await.unwrap_err();
    assert!(matches!(err, Error::InvalidRestore(_)));

    assert_eq!(app.all_students().len(), 1);
    assert_eq!(app.store.raw(keys::STUDENTS), before);
  }

  #[tokio::test]
  async fn state_survives_reopen() {
    let mut app = open().await;
    let actor = admin(&mut app).await;
    app.set_active_year("2025").await.unwrap();
    let id = app.add_student(new_student("ahmad", "2025")).await.unwrap().id;
    app.record_result(&id, Phase::One, TestResultInput::default()).await.unwrap();
    let settings = TeacherSettings { secretary_name: "puan zaleha".into(), ..Default::default() };
    app.save_settings(&actor, settings).await.unwrap();
    let students = app.all_students().to_vec();

    let app = Segak::open(app.into_store(), Policy::default()).await.unwrap();
    assert_eq!(app.all_students(), students.as_slice());
    assert_eq!(app.active_year(), "2025");
    assert_eq!(app.settings().secretary_name, "PUAN ZALEHA");
  }

  #[tokio::test]
  async fn browser_users_are_upgraded_on_open() {
    let store = MemoryStore::new();
    let raw = r#"[{"id":"admin-1","userId":"admin","name":"PENTADBIR SISTEM","password":"admin5068","role":"Admin"}]"#;
    store.put(keys::USERS, raw.into()).await.unwrap();
    store.put(keys::ACTIVE_YEAR, "2027".into()).await.unwrap();

    let app = Segak::open(store, Policy::default()).await.unwrap();
    assert!(app.authenticate("admin", "admin5068").is_ok());
    assert_eq!(app.active_year(), "2027");
    let stored = app.store.raw(keys::USERS).unwrap();
    assert!(!stored.contains("\"password\""));
    assert!(stored.contains("passwordHash"));
  }
}
