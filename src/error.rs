//! Error types for repotally.
//!
//! Uses thiserror for ergonomic error handling with proper
//! error chain propagation.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level service error.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Analyze error: {0}")]
    Analyze(#[from] AnalyzeError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Language-registry errors. Both load variants are fatal at startup:
/// the service cannot classify anything without its language table.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Language table not found at {path}: {source}")]
    MissingAsset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Language table at {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Language table at {path} defines no languages")]
    Empty { path: PathBuf },
}

/// Repository-analysis errors. Per-file open failures are absorbed at
/// file granularity and never show up here.
#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Walk failed under {path}: {reason}")]
    Walk { path: PathBuf, reason: String },
}

/// Clone-driver errors.
#[derive(Error, Debug)]
pub enum CloneError {
    #[error("Invalid clone URL {url}: {reason}")]
    Url { url: String, reason: String },

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Worktree checkout failed: {0}")]
    Checkout(String),
}

/// Task-queue errors. The quota variants are admission rejections and
/// terminate the task in DONE state with a populated error.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Repository size {size_bytes} B exceeds the per-task limit of {limit_bytes} B")]
    RepoTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("Scratch disk exhausted: {free_bytes} B free, {required_bytes} B required")]
    DiskExhausted { free_bytes: i64, required_bytes: u64 },

    #[error("Repository size {size_bytes} B does not fit the remaining disk budget")]
    BudgetExceeded { size_bytes: u64 },

    #[error("Fetch failed: {0}")]
    Fetch(#[from] CloneError),

    #[error("Task channel closed")]
    Closed,
}

/// Hosting-provider probe errors, raised before a task is ever created.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Repository not found")]
    NotFound,

    #[error("GitHub API rate limit exceeded. Try again later")]
    RateLimited,

    #[error("GitHub API error: {0}")]
    Api(String),
}

/// Configuration errors. Fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

// Error code implementations for machine-readable error responses
impl ServiceError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Registry(e) => e.code(),
            Self::Analyze(e) => e.code(),
            Self::Queue(e) => e.code(),
            Self::Probe(e) => e.code(),
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }
}

impl RegistryError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingAsset { .. } => "REGISTRY_MISSING_ASSET",
            Self::Malformed { .. } => "REGISTRY_MALFORMED",
            Self::Empty { .. } => "REGISTRY_EMPTY",
        }
    }
}

impl AnalyzeError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Walk { .. } => "WALK_FAILED",
        }
    }
}

impl QueueError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RepoTooLarge { .. } | Self::DiskExhausted { .. } | Self::BudgetExceeded { .. } => {
                "QUOTA_EXCEEDED"
            }
            Self::Fetch(_) => "FETCH_FAILED",
            Self::Closed => "QUEUE_CLOSED",
        }
    }

    /// True for admission rejections (as opposed to execution failures).
    #[must_use]
    pub fn is_quota(&self) -> bool {
        matches!(
            self,
            Self::RepoTooLarge { .. } | Self::DiskExhausted { .. } | Self::BudgetExceeded { .. }
        )
    }
}

impl ProbeError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "REPO_NOT_FOUND",
            Self::RateLimited => "RATE_LIMITED",
            Self::Api(_) => "PROVIDER_ERROR",
        }
    }
}

impl From<CloneError> for ServiceError {
    fn from(err: CloneError) -> Self {
        Self::Queue(QueueError::Fetch(err))
    }
}
