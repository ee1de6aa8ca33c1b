//! Roster helpers: the bulk paste parser, form/class/year options, and the
//! student list filter.

use serde::{Deserialize, Serialize};

use crate::student::{Gender, NewStudent, Student, StudentStatus, digits_only};

/// Teacher name written on bulk-imported students when none is configured.
pub const FALLBACK_TEACHER: &str = "GURU PJPK";

pub const FORMS: [&str; 5] = ["1", "2", "3", "4", "5"];

/// Classes offered for `form`; empty for an unknown form.
pub fn classes_for_form(form: &str) -> &'static [&'static str] {
  match form {
    "1" | "2" | "3" => &["A", "B", "C", "D", "E"],
    "4" | "5" => &["ST", "A", "B", "C", "D"],
    _ => &[],
  }
}

/// Academic years offered for selection.
pub fn year_options() -> Vec<String> { (2025..=2035).map(|y| y.to_string()).collect() }

// ─── Bulk parser ─────────────────────────────────────────────────────────────

/// A candidate student detected in pasted text, pending confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
  #[serde(rename = "nama")]
  pub name:   String,
  pub ic:     String,
  #[serde(rename = "jantina")]
  pub gender: Gender,
}

/// Class placement shared by every student of one bulk import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkMeta {
  #[serde(rename = "tingkatan")]
  pub form:  String,
  #[serde(rename = "kelas")]
  pub class: String,
  #[serde(rename = "tahun")]
  pub year:  String,
}

impl RosterEntry {
  pub fn into_new_student(self, meta: &BulkMeta, teacher: &str) -> NewStudent {
    NewStudent {
      name:    self.name,
      ic:      self.ic,
      gender:  self.gender,
      form:    meta.form.clone(),
      class:   meta.class.clone(),
      year:    meta.year.clone(),
      teacher: Some(teacher.to_owned()),
    }
  }
}

/// Parse pasted roster text, one student per line.
///
/// Fields are separated by a tab, comma, pipe, or a run of two or more
/// spaces. Lines with fewer than two fields are skipped. The output depends
/// only on `text`, so callers re-run it on every edit.
pub fn parse_bulk(text: &str) -> Vec<RosterEntry> {
  text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<RosterEntry> {
  let fields = split_fields(line);
  let [name, ic, rest @ ..] = fields.as_slice() else {
    return None;
  };

  let name = name.to_uppercase();
  let ic = digits_only(ic);
  let gender = match rest.first() {
    Some(token) => Gender::from_token(token),
    None => infer_gender(&ic),
  };

  Some(RosterEntry { name, ic, gender })
}

/// The last digit of a 12-digit national ID is even for women.
pub fn infer_gender(ic: &str) -> Gender {
  if ic.len() != 12 {
    return Gender::Male;
  }
  match ic.chars().last().and_then(|c| c.to_digit(10)) {
    Some(d) if d % 2 == 0 => Gender::Female,
    _ => Gender::Male,
  }
}

fn split_fields(line: &str) -> Vec<&str> {
  let mut fields = Vec::new();
  let mut start = 0;
  let mut chars = line.char_indices().peekable();

  while let Some((i, c)) = chars.next() {
    let is_double_space = c == ' ' && matches!(chars.peek(), Some((_, ' ')));
    if !matches!(c, '\t' | ',' | '|') && !is_double_space {
      continue;
    }
    fields.push(&line[start..i]);
    let mut end = i + c.len_utf8();
    if is_double_space {
      while let Some(&(j, ' ')) = chars.peek() {
        end = j + 1;
        chars.next();
      }
    }
    start = end;
  }
  fields.push(&line[start..]);

  fields
    .into_iter()
    .map(str::trim)
    .filter(|f| !f.is_empty())
    .collect()
}

// ─── List filter ─────────────────────────────────────────────────────────────

/// Parameters for narrowing the student list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentFilter {
  /// Case-insensitive name substring, or a substring of the ID.
  pub search: Option<String>,
  pub form:   Option<String>,
  /// Matches the overall status only.
  pub status: Option<StudentStatus>,
}

impl StudentFilter {
  pub fn matches(&self, student: &Student) -> bool {
    let search_ok = match self.search.as_deref().map(str::trim) {
      None | Some("") => true,
      Some(term) => {
        student.name.to_lowercase().contains(&term.to_lowercase()) || student.ic.contains(term)
      }
    };
    let form_ok = self.form.as_deref().is_none_or(|f| student.form == f);
    let status_ok = self.status.is_none_or(|s| student.status == s);
    search_ok && form_ok && status_ok
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::student::tests::student;

  #[test]
  fn tab_separated_with_gender() {
    let out = parse_bulk("AHMAD BIN ALI\t080101015543\tL");
    assert_eq!(out, vec![RosterEntry {
      name:   "AHMAD BIN ALI".into(),
      ic:     "080101015543".into(),
      gender: Gender::Male,
    }]);
  }

  #[test]
  fn gender_inferred_from_even_last_digit() {
    let out = parse_bulk("SITI BINTI ABU\t080202026654");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].gender, Gender::Female);
  }

  #[test]
  fn gender_inferred_only_for_twelve_digits() {
    assert_eq!(infer_gender("080202026653"), Gender::Male);
    assert_eq!(infer_gender("1234"), Gender::Male);
    assert_eq!(infer_gender(""), Gender::Male);
  }

  #[test]
  fn single_token_lines_are_dropped() {
    let out = parse_bulk("JUST A NAME\n\n   \nALI, 080101-01-5543, perempuan");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, "ALI");
    assert_eq!(out[0].ic, "080101015543");
    assert_eq!(out[0].gender, Gender::Female);
  }

  #[test]
  fn mixed_separators() {
    let out = parse_bulk("nur aina | 090303035558\r\nLIM  KAH WAI    090404045561  L\n");
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].name, "NUR AINA");
    assert_eq!(out[0].gender, Gender::Female);
    assert_eq!(out[1].name, "LIM");
    assert_eq!(out[1].ic, "");
  }

  #[test]
  fn double_space_keeps_single_spaces_inside_names() {
    let out = parse_bulk("LIM KAH WAI  090404045561");
    assert_eq!(out[0].name, "LIM KAH WAI");
    assert_eq!(out[0].ic, "090404045561");
    assert_eq!(out[0].gender, Gender::Male);
  }

  #[test]
  fn class_options_by_form() {
    assert_eq!(classes_for_form("2"), &["A", "B", "C", "D", "E"]);
    assert_eq!(classes_for_form("5")[0], "ST");
    assert!(classes_for_form("6").is_empty());
    assert_eq!(year_options().first().map(String::as_str), Some("2025"));
    assert_eq!(year_options().len(), 11);
  }

  #[test]
  fn filter_by_search_form_and_status() {
    let mut s = student("Ahmad Bin Ali");
    s.form = "3".into();
    let by_name = StudentFilter { search: Some("bin a".into()), ..Default::default() };
    assert!(by_name.matches(&s));
    let by_ic = StudentFilter { search: Some("0101".into()), ..Default::default() };
    assert!(by_ic.matches(&s));
    let wrong_form = StudentFilter { form: Some("4".into()), ..Default::default() };
    assert!(!wrong_form.matches(&s));
    let exempt = StudentFilter { status: Some(StudentStatus::Expelled), ..Default::default() };
    assert!(!exempt.matches(&s));
  }
}
