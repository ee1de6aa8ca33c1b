//! `segak` — command-line client for the SEGAK record server.
//!
//! # Usage
//!
//! ```text
//! segak --url http://localhost:8080 --user admin --password admin5068 list
//! segak --config ~/.config/segak/config.toml report --phase 1 --form 3 --class A
//! segak import --form 4 --class ST roster.txt
//! ```

mod client;
mod render;

use std::{
  io::{self, BufRead, Read, Write},
  path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use segak_core::{
  settings::TeacherSettings,
  student::{Evidence, Gender, Phase, StudentStatus},
};
use serde::Deserialize;
use serde_json::json;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "segak", about = "Command-line client for the SEGAK record server")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the SEGAK server (default: http://localhost:8080).
  #[arg(long, env = "SEGAK_URL")]
  url: Option<String>,

  /// Login id.
  #[arg(long, env = "SEGAK_USER")]
  user: Option<String>,

  /// Password (plaintext).
  #[arg(long, env = "SEGAK_PASSWORD")]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Check the credentials and record the session on the server.
  Login,
  /// Clear the recorded session.
  Logout,
  /// Show the active academic year, or switch to YEAR.
  Year { year: Option<String> },
  /// List students of the active year.
  List {
    /// Name or ID substring.
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    form:   Option<String>,
    /// Overall status label, e.g. "Pindah Keluar".
    #[arg(long)]
    status: Option<String>,
  },
  /// Register one student.
  Add {
    #[arg(long)]
    name:   String,
    /// National ID; non-digits are dropped.
    #[arg(long)]
    ic:     String,
    /// `L` or `P`; inferred from the ID when omitted.
    #[arg(long)]
    gender: Option<String>,
    #[arg(long)]
    form:   String,
    #[arg(long)]
    class:  String,
    /// Defaults to the active year.
    #[arg(long)]
    year:   Option<String>,
  },
  /// Import a pasted roster (one student per line) from FILE or stdin.
  Import {
    #[arg(long)]
    form:    String,
    #[arg(long)]
    class:   String,
    /// Defaults to the active year.
    #[arg(long)]
    year:    Option<String>,
    /// Show the detected entries without saving them.
    #[arg(long)]
    dry_run: bool,
    /// Save without asking for confirmation.
    #[arg(short, long)]
    yes:     bool,
    file:    Option<PathBuf>,
  },
  /// Record one phase's measurements for a student.
  Record {
    id:       String,
    #[arg(long)]
    phase:    u8,
    /// Test date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    date:     Option<NaiveDate>,
    /// Height in cm.
    #[arg(long, default_value_t = 0.0)]
    height:   f64,
    /// Weight in kg.
    #[arg(long, default_value_t = 0.0)]
    weight:   f64,
    /// Step test (naik turun bangku).
    #[arg(long, default_value_t = 0)]
    step:     u32,
    #[arg(long, default_value_t = 0)]
    push_ups: u32,
    #[arg(long, default_value_t = 0)]
    curl_ups: u32,
    /// Sit and reach in cm.
    #[arg(long, default_value_t = 0.0)]
    reach:    f64,
  },
  /// Change a student's status, overall (`kekal`) or for one phase.
  Status {
    id:       String,
    /// `kekal`, `fasa1` or `fasa2`.
    #[arg(long, default_value = "kekal")]
    scope:    String,
    /// Status label, e.g. "Masalah Kesihatan".
    #[arg(long)]
    status:   String,
    /// Letter or image justifying the exemption.
    #[arg(long, value_name = "FILE")]
    evidence: Option<PathBuf>,
  },
  /// Delete a student.
  Delete { id: String },
  /// Print a phase report for a class, a form, or the whole school.
  Report {
    #[arg(long)]
    phase: u8,
    #[arg(long)]
    form:  Option<String>,
    #[arg(long, requires = "form")]
    class: Option<String>,
  },
  /// Show headline counts for the active year.
  Dashboard,
  /// Show the letterhead settings, or change the given fields (admin).
  Settings(SettingsArgs),
  /// Manage user accounts (admin).
  Users {
    #[command(subcommand)]
    action: Option<UsersAction>,
  },
  /// Download a backup of every student (admin).
  Backup {
    /// Output path; defaults to the server-supplied file name.
    #[arg(short, long)]
    out: Option<PathBuf>,
  },
  /// Replace all students with the contents of a backup file (admin).
  Restore { file: PathBuf },
}

#[derive(clap::Args, Debug, Default)]
struct SettingsArgs {
  #[arg(long)]
  teacher:        Option<String>,
  #[arg(long)]
  class_teacher:  Option<String>,
  #[arg(long)]
  secretary:      Option<String>,
  #[arg(long)]
  form_taught:    Option<String>,
  #[arg(long)]
  class_taught:   Option<String>,
  #[arg(long)]
  school_name:    Option<String>,
  #[arg(long)]
  school_address: Option<String>,
  /// Image file for the report letterhead.
  #[arg(long, value_name = "FILE")]
  logo:           Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum UsersAction {
  List,
  Add {
    #[arg(long)]
    name:     String,
    #[arg(long)]
    login:    String,
    #[arg(long)]
    password: String,
    /// Create an administrator instead of a teacher.
    #[arg(long)]
    admin:    bool,
  },
  Delete { id: String },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
    username: args
      .user
      .or_else(|| (!file_cfg.username.is_empty()).then(|| file_cfg.username.clone()))
      .unwrap_or_default(),
    password: args
      .password
      .or_else(|| (!file_cfg.password.is_empty()).then(|| file_cfg.password.clone()))
      .unwrap_or_default(),
  };

  let client = ApiClient::new(api_config)?;
  run(&client, args.command).await
}

async fn run(client: &ApiClient, command: Command) -> Result<()> {
  match command {
    Command::Login => {
      let profile = client.login().await?;
      println!("Log masuk sebagai {} ({})", profile.name, profile.role);
    }

    Command::Logout => client.logout().await?,

    Command::Year { year: Some(year) } => {
      client.set_active_year(&year).await?;
      println!("Tahun aktif: {year}");
    }
    Command::Year { year: None } => println!("{}", client.active_year().await?),

    Command::List { search, form, status } => {
      if let Some(label) = &status {
        parse_status(label)?;
      }
      let students = client
        .list_students(search.as_deref(), form.as_deref(), status.as_deref())
        .await?;
      print!("{}", render::students(&students));
    }

    Command::Add { name, ic, gender, form, class, year } => {
      let year = match year {
        Some(year) => year,
        None => client.active_year().await?,
      };
      let gender = match gender {
        Some(token) => Gender::from_token(&token),
        None => {
          let digits: String = ic.chars().filter(char::is_ascii_digit).collect();
          segak_core::roster::infer_gender(&digits)
        }
      };
      let body = json!({
        "nama": name, "ic": ic, "jantina": gender.label(),
        "tingkatan": form, "kelas": class, "tahun": year,
      });
      let student = client.add_student(&body).await?;
      println!("{}  {}", student.id, student.name);
    }

    Command::Import { form, class, year, dry_run, yes, file } => {
      let text = match &file {
        Some(path) => std::fs::read_to_string(path)
          .with_context(|| format!("reading roster {}", path.display()))?,
        None => {
          let mut text = String::new();
          io::stdin().read_to_string(&mut text).context("reading roster from stdin")?;
          text
        }
      };

      let entries = client.preview_bulk(&text).await?;
      print!("{}", render::roster_preview(&entries));
      if dry_run || entries.is_empty() {
        return Ok(());
      }
      if !yes {
        if file.is_none() {
          bail!("roster was read from stdin; pass --yes to save it");
        }
        if !confirm(&format!("Simpan {} murid?", entries.len()))? {
          return Ok(());
        }
      }

      let year = match year {
        Some(year) => year,
        None => client.active_year().await?,
      };
      let added = client.commit_bulk(&form, &class, &year, &entries).await?;
      println!("{} murid disimpan ke {form}{class} ({year})", added.len());
    }

    Command::Record {
      id,
      phase,
      date,
      height,
      weight,
      step,
      push_ups,
      curl_ups,
      reach,
    } => {
      let body = json!({
        "tarikhUjian": date,
        "tinggi": height,
        "berat": weight,
        "naikTurunBangku": step,
        "tekanTubi": push_ups,
        "ringkukTubiSepara": curl_ups,
        "jangkauanMelunjur": reach,
      });
      let student = client.record_result(&id, phase, &body).await?;
      let bmi = Phase::try_from(phase)
        .ok()
        .and_then(|p| student.result(p))
        .map(|r| r.bmi)
        .unwrap_or_default();
      println!("{}  Fasa {phase} disimpan (BMI {bmi:.2})", student.name);
    }

    Command::Status { id, scope, status, evidence } => {
      let status = parse_status(&status)?;
      let evidence = evidence.as_deref().map(read_data_url).transpose()?;
      let body = json!({ "scope": scope, "status": status.label(), "suratBukti": evidence });
      let student = client.set_status(&id, &body).await?;
      println!("{}  {}", student.name, status.label());
    }

    Command::Delete { id } => {
      client.delete_student(&id).await?;
      println!("Dipadam: {id}");
    }

    Command::Report { phase, form, class } => {
      let report = client.report(phase, form.as_deref(), class.as_deref()).await?;
      print!("{}", render::report(&report));
      eprintln!("({})", report.file_name);
    }

    Command::Dashboard => print!("{}", render::dashboard(&client.dashboard().await?)),

    Command::Settings(changes) => {
      let current = client.settings().await?;
      let settings = apply_settings(current.clone(), changes)?;
      let settings = if settings == current {
        settings
      } else {
        client.save_settings(&settings).await?
      };
      println!("{}", serde_json::to_string_pretty(&settings)?);
    }

    Command::Users { action } => match action.unwrap_or(UsersAction::List) {
      UsersAction::List => print!("{}", render::users(&client.users().await?)),
      UsersAction::Add { name, login, password, admin } => {
        let role = if admin { "Admin" } else { "Guru" };
        let body = json!({ "name": name, "userId": login, "password": password, "role": role });
        let profile = client.add_user(&body).await?;
        println!("{}  {}", profile.id, profile.login_id);
      }
      UsersAction::Delete { id } => {
        client.delete_user(&id).await?;
        println!("Dipadam: {id}");
      }
    },

    Command::Backup { out } => {
      let download = client.backup().await?;
      let path = out
        .or_else(|| download.file_name.map(PathBuf::from))
        .ok_or_else(|| anyhow!("server sent no file name; pass --out"))?;
      std::fs::write(&path, download.contents)
        .with_context(|| format!("writing {}", path.display()))?;
      println!("{}", path.display());
    }

    Command::Restore { file } => {
      let contents = std::fs::read_to_string(&file)
        .with_context(|| format!("reading {}", file.display()))?;
      let summary = client.restore(contents).await?;
      println!("{} murid dipulihkan", summary.restored);
      for skipped in &summary.skipped {
        eprintln!("diabaikan: {skipped}");
      }
    }
  }
  Ok(())
}

fn parse_status(label: &str) -> Result<StudentStatus> {
  StudentStatus::from_label(label).ok_or_else(|| {
    let known: Vec<_> = StudentStatus::ALL.iter().map(|s| s.label()).collect();
    anyhow!("unknown status {label:?}; expected one of: {}", known.join(", "))
  })
}

fn apply_settings(mut settings: TeacherSettings, changes: SettingsArgs) -> Result<TeacherSettings> {
  let SettingsArgs {
    teacher,
    class_teacher,
    secretary,
    form_taught,
    class_taught,
    school_name,
    school_address,
    logo,
  } = changes;

  if let Some(v) = teacher {
    settings.teacher_name = v;
  }
  if let Some(v) = class_teacher {
    settings.class_teacher_name = v;
  }
  if let Some(v) = secretary {
    settings.secretary_name = v;
  }
  if let Some(v) = form_taught {
    settings.form_taught = v;
  }
  if let Some(v) = class_taught {
    settings.class_taught = v;
  }
  if school_name.is_some() {
    settings.school_name = school_name;
  }
  if school_address.is_some() {
    settings.school_address = school_address;
  }
  if let Some(path) = logo {
    settings.logo = Some(read_data_url(&path)?);
  }
  Ok(settings)
}

/// Read a file into a base64 `data:` URL.
fn read_data_url(path: &Path) -> Result<String> {
  let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
  Ok(Evidence::from_bytes(media_type(path), &bytes).as_str().to_owned())
}

fn media_type(path: &Path) -> &'static str {
  let ext = path
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase);
  match ext.as_deref() {
    Some("png") => "image/png",
    Some("jpg" | "jpeg") => "image/jpeg",
    Some("gif") => "image/gif",
    Some("webp") => "image/webp",
    Some("pdf") => "application/pdf",
    _ => "application/octet-stream",
  }
}

fn confirm(prompt: &str) -> Result<bool> {
  print!("{prompt} [y/N] ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(matches!(line.trim(), "y" | "Y" | "ya" | "Ya"))
}
