//! Body-mass index.

use serde::{Deserialize, Serialize};

/// `weight / (height in metres)²`, rounded to two decimals.
///
/// Returns `0.0` when either input is not strictly positive (NaN included),
/// so the function is total.
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
  if weight_kg.is_nan() || height_cm.is_nan() || weight_kg <= 0.0 || height_cm <= 0.0 {
    return 0.0;
  }
  let height_m = height_cm / 100.0;
  round2(weight_kg / (height_m * height_m))
}

pub(crate) fn round2(x: f64) -> f64 { (x * 100.0).round() / 100.0 }

/// Weight band for a BMI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
  Underweight,
  Normal,
  Overweight,
  Obese,
}

impl BmiCategory {
  /// `None` for a BMI of zero (no measurement).
  pub fn classify(bmi: f64) -> Option<Self> {
    if bmi <= 0.0 || bmi.is_nan() {
      None
    } else if bmi < 18.5 {
      Some(Self::Underweight)
    } else if bmi < 25.0 {
      Some(Self::Normal)
    } else if bmi < 30.0 {
      Some(Self::Overweight)
    } else {
      Some(Self::Obese)
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Underweight => "Kurang Berat Badan",
      Self::Normal => "Berat Badan Normal",
      Self::Overweight => "Berlebihan Berat Badan",
      Self::Obese => "Obesiti",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_or_negative_inputs_give_zero() {
    for h in [0.0, 1.0, 165.0, -3.0] {
      assert_eq!(bmi(0.0, h), 0.0);
    }
    for w in [0.0, 1.0, 55.0, -3.0] {
      assert_eq!(bmi(w, 0.0), 0.0);
    }
    assert_eq!(bmi(-1.0, 165.0), 0.0);
    assert_eq!(bmi(f64::NAN, 165.0), 0.0);
  }

  #[test]
  fn reference_value() {
    assert_eq!(bmi(55.0, 165.0), 20.2);
    assert_eq!(bmi(70.0, 175.0), 22.86);
  }

  #[test]
  fn categories() {
    assert_eq!(BmiCategory::classify(0.0), None);
    assert_eq!(BmiCategory::classify(17.0), Some(BmiCategory::Underweight));
    assert_eq!(BmiCategory::classify(18.5), Some(BmiCategory::Normal));
    assert_eq!(BmiCategory::classify(25.0), Some(BmiCategory::Overweight));
    assert_eq!(BmiCategory::classify(30.0).map(BmiCategory::label), Some("Obesiti"));
  }
}
