//! Report selection and shaping.
//!
//! A report is a read-only projection of the roster: students are selected
//! by scope, sorted by name, and mapped to display rows for one phase. The
//! presentation layer turns a [`Report`] into a printed table or PDF.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
  settings::TeacherSettings,
  student::{Phase, Student, StudentStatus},
};

/// Shown in a numeric column with no value.
pub const MISSING: &str = "-";
const SIGNATURE_PLACEHOLDER: &str = "................................................";

// ─── Request ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ReportScope {
  Class { form: String, class: String },
  Form { form: String },
  School,
}

impl ReportScope {
  pub fn includes(&self, student: &Student) -> bool {
    match self {
      Self::Class { form, class } => student.form == *form && student.class == *class,
      Self::Form { form } => student.form == *form,
      Self::School => true,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
  #[serde(flatten)]
  pub scope: ReportScope,
  pub phase: Phase,
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// One table row. Numeric columns are pre-formatted strings: a value, `-`,
/// or the two-letter status code of an exempt student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
  pub number:           usize,
  pub name:             String,
  pub ic:               String,
  pub gender:           char,
  /// Full label of the phase status.
  pub status:           String,
  pub height_m:         String,
  pub weight_kg:        String,
  pub bmi:              String,
  pub step_test:        String,
  pub push_ups:         String,
  pub partial_curl_ups: String,
  pub sit_and_reach:    String,
  /// Non-active in this phase; rendered de-emphasised.
  pub exempt:           bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Letterhead {
  pub logo:           Option<String>,
  pub school_name:    Option<String>,
  pub school_address: Option<String>,
  /// Prepared by the PJPK teacher.
  pub prepared_by:    String,
  /// Reviewed by the class teacher.
  pub reviewed_by:    String,
  /// Verified by the SEGAK secretary.
  pub verified_by:    String,
}

impl Letterhead {
  pub fn from_settings(settings: &TeacherSettings) -> Self {
    let signatory = |name: &str| {
      if name.trim().is_empty() {
        SIGNATURE_PLACEHOLDER.to_owned()
      } else {
        name.to_owned()
      }
    };
    Self {
      logo:           settings.logo.clone(),
      school_name:    settings.school_name.clone(),
      school_address: settings.school_address.clone(),
      prepared_by:    signatory(&settings.teacher_name),
      reviewed_by:    signatory(&settings.class_teacher_name),
      verified_by:    signatory(&settings.secretary_name),
    }
  }
}

/// Fixed page set-up handed to the HTML-to-PDF renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfLayout {
  pub format:        String,
  pub orientation:   String,
  /// Top, right, bottom, left.
  pub margins_mm:    [u32; 4],
  pub image_type:    String,
  pub image_quality: f32,
  pub canvas_scale:  u32,
}

impl Default for PdfLayout {
  fn default() -> Self {
    Self {
      format:        "a4".into(),
      orientation:   "portrait".into(),
      margins_mm:    [10, 10, 10, 10],
      image_type:    "jpeg".into(),
      image_quality: 0.98,
      canvas_scale:  2,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
  pub title:       String,
  pub phase_label: String,
  pub file_name:   String,
  pub letterhead:  Letterhead,
  pub layout:      PdfLayout,
  /// `(code, meaning)` pairs printed under the table.
  pub legend:      Vec<(String, String)>,
  pub rows:        Vec<ReportRow>,
}

// ─── Status codes ────────────────────────────────────────────────────────────

/// Two-letter code printed in place of measurements; empty for `Active`.
pub fn status_code(status: StudentStatus) -> &'static str {
  match status {
    StudentStatus::Active => "",
    StudentStatus::HealthIssue => "MK",
    StudentStatus::TransferredOut => "PK",
    StudentStatus::TransferredIn => "PM",
    StudentStatus::Expelled => "DS",
    StudentStatus::Other => "LL",
  }
}

fn legend() -> Vec<(String, String)> {
  [
    ("MK", "Masalah Kesihatan"),
    ("PK", "Pindah Keluar"),
    ("PM", "Pindah Masuk"),
    ("DS", "Dibuang Sekolah"),
    ("LL", "Lain-lain"),
  ]
  .into_iter()
  .map(|(c, m)| (c.to_owned(), m.to_owned()))
  .collect()
}

// ─── Generation ──────────────────────────────────────────────────────────────

/// Case-insensitive ordering with a byte-wise tie-break, so the sort is
/// total and stable across runs.
fn collate(a: &str, b: &str) -> Ordering {
  a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Students in `scope`, sorted by name.
pub fn select<'a>(
  students: impl IntoIterator<Item = &'a Student>,
  scope: &ReportScope,
) -> Vec<&'a Student> {
  let mut selected: Vec<&Student> = students.into_iter().filter(|s| scope.includes(s)).collect();
  selected.sort_by(|a, b| collate(&a.name, &b.name));
  selected
}

pub fn row(number: usize, student: &Student, phase: Phase) -> ReportRow {
  let status = student.phase_status(phase);
  let result = student.result(phase);

  let (height_m, weight_kg, bmi, step_test, push_ups, partial_curl_ups, sit_and_reach) =
    if status.is_active() {
      (
        result.map_or_else(|| MISSING.to_owned(), |r| format!("{:.2}", r.height_m())),
        decimal_cell(result.map(|r| r.weight_kg)),
        decimal_cell(result.map(|r| r.bmi)),
        count_cell(result.map(|r| r.step_test)),
        count_cell(result.map(|r| r.push_ups)),
        count_cell(result.map(|r| r.partial_curl_ups)),
        decimal_cell(result.map(|r| r.sit_and_reach)),
      )
    } else {
      let code = status_code(status).to_owned();
      (
        code.clone(),
        code.clone(),
        code.clone(),
        code.clone(),
        code.clone(),
        code.clone(),
        code,
      )
    };

  ReportRow {
    number,
    name: student.name.clone(),
    ic: student.ic.clone(),
    gender: student.gender.initial(),
    status: status.label().to_owned(),
    height_m,
    weight_kg,
    bmi,
    step_test,
    push_ups,
    partial_curl_ups,
    sit_and_reach,
    exempt: !status.is_active(),
  }
}

// A zero reading prints as missing, as on the paper forms.
fn decimal_cell(value: Option<f64>) -> String {
  match value {
    Some(v) if v != 0.0 && !v.is_nan() => v.to_string(),
    _ => MISSING.to_owned(),
  }
}

fn count_cell(value: Option<u32>) -> String {
  match value {
    Some(v) if v != 0 => v.to_string(),
    _ => MISSING.to_owned(),
  }
}

pub fn file_name(request: &ReportRequest) -> String {
  let target = match &request.scope {
    ReportScope::Class { form, class } => format!("{form}{class}"),
    ReportScope::Form { form } => form.clone(),
    ReportScope::School => "SEKOLAH".to_owned(),
  };
  format!("LAPORAN_SEGAK_Fasa{}_{target}.pdf", request.phase.number())
}

/// Build the report for `request`. Never mutates its inputs.
pub fn generate<'a>(
  students: impl IntoIterator<Item = &'a Student>,
  request: &ReportRequest,
  settings: &TeacherSettings,
) -> Report {
  let rows = select(students, &request.scope)
    .into_iter()
    .enumerate()
    .map(|(i, s)| row(i + 1, s, request.phase))
    .collect();

  Report {
    title: format!("LAPORAN ANALISIS UJIAN SEGAK - {}", request.phase.label().to_uppercase()),
    phase_label: request.phase.label(),
    file_name: file_name(request),
    letterhead: Letterhead::from_settings(settings),
    layout: PdfLayout::default(),
    legend: legend(),
    rows,
  }
}
