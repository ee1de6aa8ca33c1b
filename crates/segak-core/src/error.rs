//! Error types for `segak-core`.

use thiserror::Error;

use crate::{
  backup::RestoreError,
  student::{Phase, StudentStatus},
  user::Role,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("student not found: {0}")]
  StudentNotFound(String),

  #[error("user not found: {0}")]
  UserNotFound(String),

  /// Deliberately silent about whether the login id or the password was wrong.
  #[error("invalid login id or password")]
  InvalidCredentials,

  #[error("forbidden: requires the {required} role")]
  Forbidden { required: Role },

  #[error("admin accounts cannot be deleted")]
  ProtectedAdmin,

  #[error("login id already in use: {0}")]
  DuplicateLogin(String),

  #[error("missing required field: {0}")]
  MissingField(&'static str),

  #[error("status {0} requires an evidence attachment")]
  EvidenceRequired(StudentStatus),

  #[error("invalid evidence attachment: {0}")]
  InvalidEvidence(String),

  #[error("{phase} is not open for testing (status: {status})")]
  PhaseNotActive { phase: Phase, status: StudentStatus },

  #[error("invalid backup file: {0}")]
  InvalidRestore(#[from] RestoreError),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("password hashing error: {0}")]
  PasswordHash(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
