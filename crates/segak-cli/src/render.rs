//! Plain-text rendering of API responses.

use std::fmt::Write as _;

use comfy_table::{CellAlignment, Table, presets::UTF8_FULL_CONDENSED};
use segak_core::{
  dashboard::DashboardSummary,
  report::Report,
  roster::RosterEntry,
  student::{Phase, Student},
  user::UserProfile,
};

/// A bordered table with `header` over `rows`. Columns listed in `numeric`
/// are right-aligned.
pub fn table(header: &[&str], rows: Vec<Vec<String>>, numeric: &[usize]) -> Table {
  let mut table = Table::new();
  table.load_preset(UTF8_FULL_CONDENSED);
  if !header.is_empty() {
    table.set_header(header.to_vec());
  }
  for row in rows {
    table.add_row(row);
  }
  for &index in numeric {
    if let Some(column) = table.column_mut(index) {
      column.set_cell_alignment(CellAlignment::Right);
    }
  }
  table
}

pub fn students(students: &[Student]) -> String {
  let rows: Vec<Vec<String>> = students
    .iter()
    .map(|s| {
      let phase = |p: Phase| {
        let status = s.phase_status(p);
        if !status.is_active() {
          status.label().to_owned()
        } else if s.result(p).is_some() {
          "Lengkap".to_owned()
        } else {
          "Belum".to_owned()
        }
      };
      vec![
        s.id.clone(),
        s.name.clone(),
        s.ic.clone(),
        format!("{}{}", s.form, s.class),
        s.status.label().to_owned(),
        phase(Phase::One),
        phase(Phase::Two),
      ]
    })
    .collect();
  table(&["ID", "NAMA", "NO. KP", "KELAS", "STATUS", "FASA 1", "FASA 2"], rows, &[]).to_string()
}

pub fn roster_preview(entries: &[RosterEntry]) -> String {
  let rows: Vec<Vec<String>> = entries
    .iter()
    .enumerate()
    .map(|(i, e)| vec![(i + 1).to_string(), e.name.clone(), e.ic.clone(), e.gender.label().into()])
    .collect();
  table(&["BIL", "NAMA", "NO. KP", "JANTINA"], rows, &[0]).to_string()
}

pub fn report(report: &Report) -> String {
  let mut out = String::new();
  let head = &report.letterhead;
  for line in [&head.school_name, &head.school_address].into_iter().flatten() {
    let _ = writeln!(out, "{line}");
  }
  let _ = writeln!(out, "{}\n", report.title);

  let rows: Vec<Vec<String>> = report
    .rows
    .iter()
    .map(|r| {
      vec![
        r.number.to_string(),
        r.name.clone(),
        r.gender.to_string(),
        r.height_m.clone(),
        r.weight_kg.clone(),
        r.bmi.clone(),
        r.step_test.clone(),
        r.push_ups.clone(),
        r.partial_curl_ups.clone(),
        r.sit_and_reach.clone(),
      ]
    })
    .collect();
  let table = table(
    &["BIL", "NAMA", "J", "TINGGI", "BERAT", "BMI", "NTB", "TT", "RTS", "JM"],
    rows,
    &[0, 3, 4, 5, 6, 7, 8, 9],
  );
  let _ = writeln!(out, "{table}");

  let legend: Vec<String> = report.legend.iter().map(|(c, m)| format!("{c} = {m}")).collect();
  let _ = writeln!(out, "\n{}", legend.join(", "));
  let _ = writeln!(out, "\nDisediakan oleh: {}", head.prepared_by);
  let _ = writeln!(out, "Disemak oleh:    {}", head.reviewed_by);
  let _ = writeln!(out, "Disahkan oleh:   {}", head.verified_by);
  out
}

pub fn dashboard(summary: &DashboardSummary) -> String {
  let rows = vec![
    vec!["Jumlah murid".to_owned(), summary.total.to_string()],
    vec!["Aktif".to_owned(), summary.active.to_string()],
    vec!["Tidak aktif".to_owned(), summary.inactive.to_string()],
    vec![
      "Fasa 1 (lengkap / belum)".to_owned(),
      format!("{} / {}", summary.phase1.completed, summary.phase1.pending),
    ],
    vec![
      "Fasa 2 (lengkap / belum)".to_owned(),
      format!("{} / {}", summary.phase2.completed, summary.phase2.pending),
    ],
  ];
  table(&[], rows, &[1]).to_string()
}

pub fn users(users: &[UserProfile]) -> String {
  let rows: Vec<Vec<String>> = users
    .iter()
    .map(|u| vec![u.id.clone(), u.login_id.clone(), u.name.clone(), u.role.to_string()])
    .collect();
  table(&["ID", "LOG MASUK", "NAMA", "PERANAN"], rows, &[]).to_string()
}
