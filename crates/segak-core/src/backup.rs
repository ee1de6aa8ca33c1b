//! Roster backup and restore.
//!
//! A backup is the full student array as indented JSON. Restoring replaces
//! the whole collection; nothing is merged.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::student::Student;

/// How strictly a restore file is checked, record by record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreMode {
  /// Any malformed record rejects the whole file.
  #[default]
  Strict,
  /// Malformed records are skipped and counted.
  Lenient,
}

/// A record that failed the schema check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
  pub index:   usize,
  pub message: String,
}

impl fmt::Display for RecordError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "record {}: {}", self.index, self.message)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestoreError {
  #[error("not valid JSON: {0}")]
  NotJson(String),

  #[error("expected a JSON array of students")]
  NotAnArray,

  #[error("{} malformed record(s), first: {}", .0.len(), .0.first().map(ToString::to_string).unwrap_or_default())]
  InvalidRecords(Vec<RecordError>),
}

/// Students accepted from a restore file.
#[derive(Debug, Clone, PartialEq)]
pub struct Restored {
  pub students: Vec<Student>,
  /// Records dropped in lenient mode.
  pub skipped:  Vec<RecordError>,
}

/// Outcome of a restore, as reported back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreSummary {
  pub restored: usize,
  pub skipped:  Vec<RecordError>,
}

/// A serialised backup ready to hand to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
  pub file_name: String,
  pub contents:  String,
}

pub fn file_name(date: NaiveDate) -> String { format!("backup_segak_{}.json", date.format("%Y-%m-%d")) }

pub fn export(students: &[Student], date: NaiveDate) -> serde_json::Result<Backup> {
  Ok(Backup {
    file_name: file_name(date),
    contents:  serde_json::to_string_pretty(students)?,
  })
}

/// Parse and check a restore file.
pub fn parse(text: &str, mode: RestoreMode) -> Result<Restored, RestoreError> {
  let value: Value = serde_json::from_str(text).map_err(|e| RestoreError::NotJson(e.to_string()))?;
  let Value::Array(items) = value else {
    return Err(RestoreError::NotAnArray);
  };

  let mut students = Vec::with_capacity(items.len());
  let mut errors = Vec::new();
  for (index, item) in items.into_iter().enumerate() {
    match serde_json::from_value::<Student>(item) {
      Ok(student) => students.push(student),
      Err(e) => errors.push(RecordError { index, message: e.to_string() }),
    }
  }

  match mode {
    RestoreMode::Strict if !errors.is_empty() => Err(RestoreError::InvalidRecords(errors)),
    _ => Ok(Restored { students, skipped: errors }),
  }
}
