//! Per-phase status tracking.
//!
//! A student carries an overall status plus optional overrides for each
//! phase. An override wins for its own phase only; a permanent change
//! rewrites the overall status and drops both overrides so that every phase
//! follows it.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  student::{Evidence, Phase, Student, StudentStatus},
};

/// Which part of the record a status change targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusScope {
  Fasa1,
  Fasa2,
  /// Overall status, applied to both phases ("kekal").
  Kekal,
}

impl StatusScope {
  pub fn phase(self) -> Option<Phase> {
    match self {
      Self::Fasa1 => Some(Phase::One),
      Self::Fasa2 => Some(Phase::Two),
      Self::Kekal => None,
    }
  }
}

impl From<Phase> for StatusScope {
  fn from(p: Phase) -> Self {
    match p {
      Phase::One => Self::Fasa1,
      Phase::Two => Self::Fasa2,
    }
  }
}

/// Whether an exemption status must come with an evidence attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidencePolicy {
  #[default]
  Required,
  Optional,
}

/// A requested status transition.
#[derive(Debug, Clone)]
pub struct StatusChange {
  pub scope:    StatusScope,
  pub status:   StudentStatus,
  pub evidence: Option<Evidence>,
}

/// Apply `change` to `student`.
///
/// Setting `Active` discards any evidence for the targeted scope. Any other
/// status is rejected without evidence under [`EvidencePolicy::Required`];
/// the student is left untouched on error.
pub fn apply(student: &mut Student, change: StatusChange, policy: EvidencePolicy) -> Result<()> {
  let evidence = if change.status.is_active() {
    None
  } else {
    if change.evidence.is_none() && policy == EvidencePolicy::Required {
      return Err(Error::EvidenceRequired(change.status));
    }
    change.evidence
  };

  match change.scope {
    StatusScope::Fasa1 => {
      student.phase1_status = Some(change.status);
      student.phase1_evidence = evidence;
    }
    StatusScope::Fasa2 => {
      student.phase2_status = Some(change.status);
      student.phase2_evidence = evidence;
    }
    StatusScope::Kekal => {
      student.status = change.status;
      student.evidence = evidence;
      student.phase1_status = None;
      student.phase1_evidence = None;
      student.phase2_status = None;
      student.phase2_evidence = None;
    }
  }
  student.touch();
  Ok(())
}

/// What a student's cell for one phase shows in the roster list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhaseView {
  /// Open for testing; `complete` when a result is on record.
  Entry { complete: bool },
  /// Exempt for this phase.
  Exempt {
    status:   StudentStatus,
    evidence: Option<Evidence>,
  },
}

pub fn phase_view(student: &Student, phase: Phase) -> PhaseView {
  let status = student.phase_status(phase);
  if status.is_active() {
    PhaseView::Entry { complete: student.result(phase).is_some() }
  } else {
    PhaseView::Exempt {
      status,
      evidence: student.phase_evidence(phase).cloned(),
    }
  }
}

/// Results may only be recorded while the phase is active.
pub fn ensure_recordable(student: &Student, phase: Phase) -> Result<()> {
  let status = student.phase_status(phase);
  if status.is_active() {
    Ok(())
  } else {
    Err(Error::PhaseNotActive { phase, status })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::student::tests::student;

  fn letter() -> Option<Evidence> { Some(Evidence::from_bytes("application/pdf", b"%PDF")) }

  #[test]
  fn phase_one_override_leaves_phase_two_on_overall() {
    let mut s = student("A");
    s.status = StudentStatus::TransferredIn;
    apply(
      &mut s,
      StatusChange { scope: StatusScope::Fasa1, status: StudentStatus::HealthIssue, evidence: letter() },
      EvidencePolicy::Required,
    )
    .unwrap();
    assert_eq!(s.phase_status(Phase::One), StudentStatus::HealthIssue);
    assert_eq!(s.phase_status(Phase::Two), s.status);
    assert_eq!(s.status, StudentStatus::TransferredIn);
  }

  #[test]
  fn permanent_change_applies_everywhere() {
    let mut s = student("A");
    s.phase1_status = Some(StudentStatus::HealthIssue);
    s.phase1_evidence = letter();
    apply(
      &mut s,
      StatusChange { scope: StatusScope::Kekal, status: StudentStatus::TransferredOut, evidence: letter() },
      EvidencePolicy::Required,
    )
    .unwrap();
    assert_eq!(s.status, StudentStatus::TransferredOut);
    assert_eq!(s.phase_status(Phase::One), StudentStatus::TransferredOut);
    assert_eq!(s.phase_status(Phase::Two), StudentStatus::TransferredOut);
    assert_eq!(s.phase_evidence(Phase::One), s.evidence.as_ref());
  }

  #[test]
  fn exemption_without_evidence_is_rejected_when_required() {
    let mut s = student("A");
    let before = s.clone();
    let err = apply(
      &mut s,
      StatusChange { scope: StatusScope::Fasa2, status: StudentStatus::Expelled, evidence: None },
      EvidencePolicy::Required,
    )
    .unwrap_err();
    assert!(matches!(err, Error::EvidenceRequired(StudentStatus::Expelled)));
    assert_eq!(s, before);
  }

  #[test]
  fn exemption_without_evidence_allowed_when_optional() {
    let mut s = student("A");
    apply(
      &mut s,
      StatusChange { scope: StatusScope::Fasa2, status: StudentStatus::Other, evidence: None },
      EvidencePolicy::Optional,
    )
    .unwrap();
    assert_eq!(s.phase_status(Phase::Two), StudentStatus::Other);
  }

  #[test]
  fn reactivating_clears_evidence() {
    let mut s = student("A");
    apply(
      &mut s,
      StatusChange { scope: StatusScope::Fasa1, status: StudentStatus::HealthIssue, evidence: letter() },
      EvidencePolicy::Required,
    )
    .unwrap();
    apply(
      &mut s,
      StatusChange { scope: StatusScope::Fasa1, status: StudentStatus::Active, evidence: letter() },
      EvidencePolicy::Required,
    )
    .unwrap();
    assert_eq!(s.phase_status(Phase::One), StudentStatus::Active);
    assert!(s.phase1_evidence.is_none());
  }

  #[test]
  fn views_and_recordability() {
    let mut s = student("A");
    assert_eq!(phase_view(&s, Phase::One), PhaseView::Entry { complete: false });
    assert!(ensure_recordable(&s, Phase::One).is_ok());

    s.phase2_status = Some(StudentStatus::HealthIssue);
    s.evidence = letter();
    assert_eq!(phase_view(&s, Phase::Two), PhaseView::Exempt {
      status:   StudentStatus::HealthIssue,
      evidence: letter(),
    });
    assert!(matches!(
      ensure_recordable(&s, Phase::Two),
      Err(Error::PhaseNotActive { phase: Phase::Two, status: StudentStatus::HealthIssue })
    ));
  }
}
