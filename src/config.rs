//! Service configuration.
//!
//! All knobs are environment variables (a `.env` file is honored) with
//! conservative defaults, so the binary runs out of the box. Values that
//! gate disk usage are taken in megabytes and converted once, here.

use crate::error::ConfigError;
use std::path::PathBuf;

const MIB: u64 = 1024 * 1024;

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ceiling on total scratch-dir usage, bytes.
    pub max_disk_bytes: u64,
    /// Hard per-task reject threshold, bytes.
    pub max_repo_bytes: u64,
    /// Writes between filesystem reconciliations.
    pub sync_every: u32,
    /// Route large files onto the worker pool.
    pub use_file_workers: bool,
    /// Emit capacity/size log lines.
    pub debug: bool,
    /// HTTP listen port.
    pub port: u16,
    /// Optional GitHub token; unlocks a higher API quota for size probes.
    pub github_token: Option<String>,
    /// Scratch root for clone directories. Defaults to the system temp dir.
    pub scratch_dir: PathBuf,
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a variable is present but does
    /// not parse; missing variables fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            max_disk_bytes: u64_env("MAX_DISK_SIZE_MB", 1024)? * MIB,
            max_repo_bytes: u64_env("MAX_REPO_SIZE_MB", 100)? * MIB,
            sync_every: u64_env("SYNC_EVERY", 5)? as u32,
            use_file_workers: bool_env("USE_FILE_WORKERS", true),
            debug: bool_env("DEBUG", false),
            port: u64_env("PORT", 8080)? as u16,
            github_token: env_var("GITHUB_TOKEN"),
            scratch_dir: std::env::temp_dir(),
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn u64_env(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env_var(key) {
        Some(raw) => parse_u64(key, &raw),
        None => Ok(default),
    }
}

fn parse_u64(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn bool_env(key: &str, default: bool) -> bool {
    match env_var(key) {
        Some(raw) => raw == "1" || raw == "true",
        None => default,
    }
}
