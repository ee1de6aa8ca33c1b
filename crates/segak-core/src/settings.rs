//! School letterhead settings.

use serde::{Deserialize, Serialize};

/// Display fields used on report letterheads and as defaults for new
/// students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherSettings {
  /// PJPK teacher; prepares the report and is the default assigned teacher.
  #[serde(rename = "namaGuru", default)]
  pub teacher_name:       String,
  #[serde(rename = "namaGuruKelas", default)]
  pub class_teacher_name: String,
  /// SEGAK secretary who verifies the report.
  #[serde(rename = "namaSetiausaha", default)]
  pub secretary_name:     String,
  #[serde(rename = "tingkatanDiajar", default)]
  pub form_taught:        String,
  #[serde(rename = "kelasDiajar", default)]
  pub class_taught:       String,
  /// Logo as a `data:` URL.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub logo:               Option<String>,
  #[serde(rename = "namaSekolah", default, skip_serializing_if = "Option::is_none")]
  pub school_name:        Option<String>,
  #[serde(rename = "alamatSekolah", default, skip_serializing_if = "Option::is_none")]
  pub school_address:     Option<String>,
}

impl Default for TeacherSettings {
  fn default() -> Self {
    Self {
      teacher_name:       String::new(),
      class_teacher_name: String::new(),
      secretary_name:     String::new(),
      form_taught:        "1".into(),
      class_taught:       "A".into(),
      logo:               None,
      school_name:        None,
      school_address:     None,
    }
  }
}

impl TeacherSettings {
  /// Upper-case the staff names and drop empty optional fields.
  pub fn normalized(mut self) -> Self {
    self.teacher_name = self.teacher_name.trim().to_uppercase();
    self.class_teacher_name = self.class_teacher_name.trim().to_uppercase();
    self.secretary_name = self.secretary_name.trim().to_uppercase();
    for field in [&mut self.logo, &mut self.school_name, &mut self.school_address] {
      if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
        *field = None;
      }
    }
    self
  }
}
