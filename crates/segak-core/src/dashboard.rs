//! Headline counts for the landing page.

use serde::{Deserialize, Serialize};

use crate::student::{Phase, Student};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseProgress {
  pub completed: usize,
  pub pending:   usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
  pub total:    usize,
  /// Overall status `Aktif`.
  pub active:   usize,
  pub inactive: usize,
  /// Progress counts consider overall-active students only.
  pub phase1:   PhaseProgress,
  pub phase2:   PhaseProgress,
}

pub fn summarize<'a>(students: impl IntoIterator<Item = &'a Student>) -> DashboardSummary {
  let mut summary = DashboardSummary::default();
  for student in students {
    summary.total += 1;
    if !student.status.is_active() {
      summary.inactive += 1;
      continue;
    }
    summary.active += 1;
    for (phase, progress) in [(Phase::One, &mut summary.phase1), (Phase::Two, &mut summary.phase2)] {
      if student.result(phase).is_some() {
        progress.completed += 1;
      } else {
        progress.pending += 1;
      }
    }
  }
  summary
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::student::{StudentStatus, TestResult, TestResultInput, tests::student};

  #[test]
  fn counts_progress_among_active_students() {
    let mut done = student("A");
    done.phase1 = Some(TestResult::from_input(TestResultInput::default()));
    let pending = student("B");
    let mut gone = student("C");
    gone.status = StudentStatus::TransferredOut;
    gone.phase2 = Some(TestResult::from_input(TestResultInput::default()));

    let summary = summarize(&[done, pending, gone]);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.active, 2);
    assert_eq!(summary.inactive, 1);
    assert_eq!(summary.phase1, PhaseProgress { completed: 1, pending: 1 });
    assert_eq!(summary.phase2, PhaseProgress { completed: 0, pending: 2 });
  }
}
