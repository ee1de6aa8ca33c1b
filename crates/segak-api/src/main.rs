//! segak-server binary.
//!
//! Reads `segak.toml` (or the path given with `--config`) plus `SEGAK_*`
//! environment variables, opens the SQLite store, and serves the JSON API
//! over HTTP.
//!
//! # Seed admin password
//!
//! `admin_password` may hold a plaintext password or an argon2 PHC string.
//! To print the PHC string for a password:
//!
//! ```text
//! cargo run -p segak-api --bin segak-server -- --hash-password
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use segak_api::{AppState, ServerConfig};
use segak_core::Segak;
use segak_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "SEGAK fitness-test record server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "segak.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let password = read_password()?;
    let hash = segak_core::auth::hash_password(&password).context("failed to hash password")?;
    println!("{hash}");
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SEGAK"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(dir) = store_path.parent().filter(|d| !d.as_os_str().is_empty()) {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create store directory {dir:?}"))?;
  }

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let segak = Segak::open(store, server_cfg.policy())
    .await
    .context("failed to load application state")?;
  tracing::info!(
    evidence = ?server_cfg.policy().evidence,
    restore = ?server_cfg.restore_mode,
    "policy"
  );

  let app = axum::Router::new().nest("/api", segak_api::router(AppState::new(segak)));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
