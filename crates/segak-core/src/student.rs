//! Student records and per-phase test results.
//!
//! The serialised field names follow the roster format used by existing
//! SEGAK backups (`nama`, `ic`, `jantina`, `fasa1`, ...), so a backup taken
//! from the browser application restores here unchanged.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{DateTime, Local, NaiveDate, SubsecRound as _, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, bmi::bmi};

/// Upper bound recorded for the push-up component.
pub const MAX_PUSH_UPS: u32 = 40;
/// Upper bound recorded for the partial curl-up component.
pub const MAX_PARTIAL_CURL_UPS: u32 = 25;

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gender {
  #[default]
  #[serde(rename = "Lelaki")]
  Male,
  #[serde(rename = "Perempuan")]
  Female,
}

impl Gender {
  pub fn label(self) -> &'static str {
    match self {
      Self::Male => "Lelaki",
      Self::Female => "Perempuan",
    }
  }

  /// Single-letter form shown next to the ID in reports.
  pub fn initial(self) -> char {
    match self {
      Self::Male => 'L',
      Self::Female => 'P',
    }
  }

  /// Resolve a free-text gender token: anything starting with `P` is female.
  pub fn from_token(token: &str) -> Self {
    if token.trim().to_uppercase().starts_with('P') {
      Self::Female
    } else {
      Self::Male
    }
  }
}

/// Enrolment / exemption status of a student, overall or for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StudentStatus {
  #[default]
  #[serde(rename = "Aktif")]
  Active,
  #[serde(rename = "Pindah Masuk")]
  TransferredIn,
  #[serde(rename = "Pindah Keluar")]
  TransferredOut,
  #[serde(rename = "Dibuang")]
  Expelled,
  #[serde(rename = "Masalah Kesihatan")]
  HealthIssue,
  #[serde(rename = "Lain-lain")]
  Other,
}

impl StudentStatus {
  pub const ALL: [Self; 6] = [
    Self::Active,
    Self::TransferredIn,
    Self::TransferredOut,
    Self::Expelled,
    Self::HealthIssue,
    Self::Other,
  ];

  pub fn is_active(self) -> bool { matches!(self, Self::Active) }

  pub fn label(self) -> &'static str {
    match self {
      Self::Active => "Aktif",
      Self::TransferredIn => "Pindah Masuk",
      Self::TransferredOut => "Pindah Keluar",
      Self::Expelled => "Dibuang",
      Self::HealthIssue => "Masalah Kesihatan",
      Self::Other => "Lain-lain",
    }
  }

  pub fn from_label(label: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|s| s.label() == label)
  }
}

impl fmt::Display for StudentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// One of the two testing terms of an academic year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Phase {
  One,
  Two,
}

impl Phase {
  pub fn number(self) -> u8 {
    match self {
      Self::One => 1,
      Self::Two => 2,
    }
  }

  /// `"Fasa 1"` / `"Fasa 2"`.
  pub fn label(self) -> String { format!("Fasa {}", self.number()) }
}

impl TryFrom<u8> for Phase {
  type Error = String;

  fn try_from(n: u8) -> std::result::Result<Self, Self::Error> {
    match n {
      1 => Ok(Self::One),
      2 => Ok(Self::Two),
      other => Err(format!("phase must be 1 or 2, got {other}")),
    }
  }
}

impl From<Phase> for u8 {
  fn from(p: Phase) -> Self { p.number() }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Fasa {}", self.number())
  }
}

// ─── Evidence ────────────────────────────────────────────────────────────────

/// An uploaded letter or image justifying an exemption, stored inline as a
/// base64 `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Evidence(String);

impl Evidence {
  pub fn from_bytes(media_type: &str, bytes: &[u8]) -> Self {
    Self(format!("data:{media_type};base64,{}", B64.encode(bytes)))
  }

  /// Accept a `data:<media-type>;base64,<payload>` URL, checking that the
  /// payload decodes.
  pub fn from_data_url(url: impl Into<String>) -> Result<Self> {
    let url = url.into();
    let (_, payload) = split_data_url(&url)
      .ok_or_else(|| Error::InvalidEvidence("expected a base64 data: URL".into()))?;
    B64
      .decode(payload)
      .map_err(|e| Error::InvalidEvidence(e.to_string()))?;
    Ok(Self(url))
  }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn media_type(&self) -> Option<&str> {
    split_data_url(&self.0).map(|(media, _)| media)
  }

  pub fn decode(&self) -> Result<Vec<u8>> {
    let (_, payload) = split_data_url(&self.0)
      .ok_or_else(|| Error::InvalidEvidence("expected a base64 data: URL".into()))?;
    B64
      .decode(payload)
      .map_err(|e| Error::InvalidEvidence(e.to_string()))
  }
}

fn split_data_url(url: &str) -> Option<(&str, &str)> {
  url.strip_prefix("data:")?.split_once(";base64,")
}

// ─── Test results ────────────────────────────────────────────────────────────

/// One phase's measurements for a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
  #[serde(rename = "tarikhUjian")]
  pub date:             NaiveDate,
  #[serde(rename = "tinggi")]
  pub height_cm:        f64,
  #[serde(rename = "berat")]
  pub weight_kg:        f64,
  /// Always derived from height and weight; see [`crate::bmi::bmi`].
  pub bmi:              f64,
  /// Step-test count (naik turun bangku).
  #[serde(rename = "naikTurunBangku")]
  pub step_test:        u32,
  #[serde(rename = "tekanTubi")]
  pub push_ups:         u32,
  #[serde(rename = "ringkukTubiSepara")]
  pub partial_curl_ups: u32,
  /// Sit-and-reach distance in centimetres (jangkauan melunjur).
  #[serde(rename = "jangkauanMelunjur")]
  pub sit_and_reach:    f64,
}

/// Measurements as typed in, before derivation and clamping.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestResultInput {
  /// Defaults to today when absent.
  #[serde(rename = "tarikhUjian", default)]
  pub date:             Option<NaiveDate>,
  #[serde(rename = "tinggi", default)]
  pub height_cm:        f64,
  #[serde(rename = "berat", default)]
  pub weight_kg:        f64,
  #[serde(rename = "naikTurunBangku", default)]
  pub step_test:        u32,
  #[serde(rename = "tekanTubi", default)]
  pub push_ups:         u32,
  #[serde(rename = "ringkukTubiSepara", default)]
  pub partial_curl_ups: u32,
  #[serde(rename = "jangkauanMelunjur", default)]
  pub sit_and_reach:    f64,
}

impl TestResult {
  pub fn from_input(input: TestResultInput) -> Self {
    let mut result = Self {
      date:             input.date.unwrap_or_else(|| Local::now().date_naive()),
      height_cm:        input.height_cm,
      weight_kg:        input.weight_kg,
      bmi:              0.0,
      step_test:        input.step_test,
      push_ups:         input.push_ups.min(MAX_PUSH_UPS),
      partial_curl_ups: input.partial_curl_ups.min(MAX_PARTIAL_CURL_UPS),
      sit_and_reach:    input.sit_and_reach,
    };
    result.recompute_bmi();
    result
  }

  pub fn set_height(&mut self, height_cm: f64) {
    self.height_cm = height_cm;
    self.recompute_bmi();
  }

  pub fn set_weight(&mut self, weight_kg: f64) {
    self.weight_kg = weight_kg;
    self.recompute_bmi();
  }

  pub fn height_m(&self) -> f64 { self.height_cm / 100.0 }

  fn recompute_bmi(&mut self) { self.bmi = bmi(self.weight_kg, self.height_cm); }
}

// ─── Student ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
  pub id:              String,
  #[serde(rename = "nama")]
  pub name:            String,
  /// National ID number, digits only.
  pub ic:              String,
  #[serde(rename = "jantina")]
  pub gender:          Gender,
  #[serde(rename = "tingkatan")]
  pub form:            String,
  #[serde(rename = "kelas")]
  pub class:           String,
  #[serde(rename = "tahun")]
  pub year:            String,
  /// Assigned PJPK (physical education) teacher.
  #[serde(rename = "namaGuruPJPK", default)]
  pub teacher:         String,
  /// Overall status; the default for any phase without an override.
  pub status:          StudentStatus,
  #[serde(rename = "suratBukti", default, skip_serializing_if = "Option::is_none")]
  pub evidence:        Option<Evidence>,
  #[serde(rename = "statusFasa1", default, skip_serializing_if = "Option::is_none")]
  pub phase1_status:   Option<StudentStatus>,
  #[serde(rename = "suratBuktiFasa1", default, skip_serializing_if = "Option::is_none")]
  pub phase1_evidence: Option<Evidence>,
  #[serde(rename = "statusFasa2", default, skip_serializing_if = "Option::is_none")]
  pub phase2_status:   Option<StudentStatus>,
  #[serde(rename = "suratBuktiFasa2", default, skip_serializing_if = "Option::is_none")]
  pub phase2_evidence: Option<Evidence>,
  #[serde(rename = "fasa1", default, skip_serializing_if = "Option::is_none")]
  pub phase1:          Option<TestResult>,
  #[serde(rename = "fasa2", default, skip_serializing_if = "Option::is_none")]
  pub phase2:          Option<TestResult>,
  #[serde(rename = "lastUpdated", with = "chrono::serde::ts_milliseconds")]
  pub last_updated:    DateTime<Utc>,
}

impl Student {
  pub fn result(&self, phase: Phase) -> Option<&TestResult> {
    match phase {
      Phase::One => self.phase1.as_ref(),
      Phase::Two => self.phase2.as_ref(),
    }
  }

  pub(crate) fn result_slot(&mut self, phase: Phase) -> &mut Option<TestResult> {
    match phase {
      Phase::One => &mut self.phase1,
      Phase::Two => &mut self.phase2,
    }
  }

  /// The phase-specific override, if any.
  pub fn status_override(&self, phase: Phase) -> Option<StudentStatus> {
    match phase {
      Phase::One => self.phase1_status,
      Phase::Two => self.phase2_status,
    }
  }

  /// Status in force for `phase`: the override, else the overall status.
  pub fn phase_status(&self, phase: Phase) -> StudentStatus {
    self.status_override(phase).unwrap_or(self.status)
  }

  /// Evidence backing the phase status: the phase attachment, else the
  /// overall one.
  pub fn phase_evidence(&self, phase: Phase) -> Option<&Evidence> {
    let own = match phase {
      Phase::One => self.phase1_evidence.as_ref(),
      Phase::Two => self.phase2_evidence.as_ref(),
    };
    own.or(self.evidence.as_ref())
  }

  pub fn touch(&mut self) { self.last_updated = now_millis(); }
}

/// Fields supplied when registering one student.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewStudent {
  #[serde(rename = "nama")]
  pub name:    String,
  pub ic:      String,
  #[serde(rename = "jantina", default)]
  pub gender:  Gender,
  #[serde(rename = "tingkatan")]
  pub form:    String,
  #[serde(rename = "kelas")]
  pub class:   String,
  #[serde(rename = "tahun")]
  pub year:    String,
  /// Falls back to the configured teacher when absent.
  #[serde(rename = "namaGuruPJPK", default)]
  pub teacher: Option<String>,
}

impl NewStudent {
  /// Build an active student with a fresh id, normalising the name to upper
  /// case and the ID to digits. Both must be non-empty.
  pub fn into_student(self, default_teacher: &str) -> Result<Student> {
    if self.name.trim().is_empty() {
      return Err(Error::MissingField("nama"));
    }
    if digits_only(&self.ic).is_empty() {
      return Err(Error::MissingField("ic"));
    }
    Ok(self.build(default_teacher))
  }

  /// [`into_student`](Self::into_student) without the field checks; bulk
  /// imports commit whatever the parser detected.
  pub(crate) fn build(self, default_teacher: &str) -> Student {
    let teacher = self
      .teacher
      .filter(|t| !t.trim().is_empty())
      .unwrap_or_else(|| default_teacher.to_owned());

    Student {
      id: uuid::Uuid::new_v4().to_string(),
      name: self.name.trim().to_uppercase(),
      ic: digits_only(&self.ic),
      gender: self.gender,
      form: self.form,
      class: self.class,
      year: self.year,
      teacher,
      status: StudentStatus::Active,
      evidence: None,
      phase1_status: None,
      phase1_evidence: None,
      phase2_status: None,
      phase2_evidence: None,
      phase1: None,
      phase2: None,
      last_updated: now_millis(),
    }
  }
}

/// A partial profile edit; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentUpdate {
  #[serde(rename = "nama", default)]
  pub name:    Option<String>,
  #[serde(default)]
  pub ic:      Option<String>,
  #[serde(rename = "jantina", default)]
  pub gender:  Option<Gender>,
  #[serde(rename = "tingkatan", default)]
  pub form:    Option<String>,
  #[serde(rename = "kelas", default)]
  pub class:   Option<String>,
  #[serde(rename = "tahun", default)]
  pub year:    Option<String>,
  #[serde(rename = "namaGuruPJPK", default)]
  pub teacher: Option<String>,
}

impl StudentUpdate {
  pub fn apply(self, student: &mut Student) -> Result<()> {
    if let Some(name) = self.name {
      let name = name.trim().to_uppercase();
      if name.is_empty() {
        return Err(Error::MissingField("nama"));
      }
      student.name = name;
    }
    if let Some(ic) = self.ic {
      let ic = digits_only(&ic);
      if ic.is_empty() {
        return Err(Error::MissingField("ic"));
      }
      student.ic = ic;
    }
    if let Some(gender) = self.gender {
      student.gender = gender;
    }
    if let Some(form) = self.form {
      student.form = form;
    }
    if let Some(class) = self.class {
      student.class = class;
    }
    if let Some(year) = self.year {
      student.year = year;
    }
    if let Some(teacher) = self.teacher {
      student.teacher = teacher;
    }
    student.touch();
    Ok(())
  }
}

/// `lastUpdated` is stored in epoch milliseconds; keep no finer precision.
pub(crate) fn now_millis() -> DateTime<Utc> { Utc::now().trunc_subsecs(3) }

pub(crate) fn digits_only(s: &str) -> String {
  s.chars().filter(char::is_ascii_digit).collect()
}
