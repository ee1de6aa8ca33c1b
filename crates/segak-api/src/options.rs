//! `GET /options` — the fixed choices offered by entry forms.

use std::collections::BTreeMap;

use axum::Json;
use segak_core::{
  roster::{FORMS, classes_for_form, year_options},
  student::StudentStatus,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Options {
  pub tingkatan: Vec<&'static str>,
  /// Classes offered for each form.
  pub kelas:     BTreeMap<&'static str, &'static [&'static str]>,
  pub tahun:     Vec<String>,
  pub status:    Vec<&'static str>,
}

pub async fn handler() -> Json<Options> {
  Json(Options {
    tingkatan: FORMS.to_vec(),
    kelas:     FORMS.iter().map(|&f| (f, classes_for_form(f))).collect(),
    tahun:     year_options(),
    status:    StudentStatus::ALL.iter().map(|s| s.label()).collect(),
  })
}
