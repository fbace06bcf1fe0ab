//! Runtime configuration, read once at startup from the environment.
//!
//! Everything lives under a single data directory so a deployment (or a test)
//! is fully described by `LEXDRAFT_DATA_DIR`:
//!
//! - `lexdraft.sqlite` — the database
//! - `templates/`     — uploaded template files
//! - `output/`        — generated documents
//! - `remote/`        — the folder-mirror remote store (stand-in for the
//!   firm's Dropbox when no real remote is wired up)

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_FONTS_DIR: &str = "./fonts";
const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_BUNDLE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    /// Font directory for PDF rendering (Arial with a LiberationSans
    /// fallback, same as the preview styling).
    pub fonts_dir: PathBuf,
    /// How long a cached client bundle stays fresh.
    pub bundle_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = env::var("LEXDRAFT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));
        let fonts_dir = env::var("LEXDRAFT_FONTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_FONTS_DIR));
        let bind_addr =
            env::var("LEXDRAFT_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
        let bundle_ttl = env::var("LEXDRAFT_BUNDLE_TTL_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_BUNDLE_TTL_SECS));

        AppConfig {
            bind_addr,
            data_dir,
            fonts_dir,
            bundle_ttl,
        }
    }

    /// A config rooted at an explicit directory; used by tests.
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        AppConfig {
            bind_addr: DEFAULT_BIND.to_string(),
            data_dir: dir.into(),
            fonts_dir: PathBuf::from(DEFAULT_FONTS_DIR),
            bundle_ttl: Duration::from_secs(DEFAULT_BUNDLE_TTL_SECS),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("lexdraft.sqlite")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.data_dir.join("templates")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join("output")
    }

    pub fn remote_dir(&self) -> PathBuf {
        self.data_dir.join("remote")
    }

    /// Creates the data directory tree if it is not there yet.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.data_dir.as_path(),
            &self.templates_dir(),
            &self.output_dir(),
            &self.remote_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Join a file name onto a directory, rejecting anything that could escape
/// it. Upload metadata and filename patterns are staff-supplied, so derived
/// names always pass through here.
pub fn safe_join(dir: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
        return None;
    }
    Some(dir.join(name))
}
