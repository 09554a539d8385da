//! Core services: classification, counting, and repository analysis.

pub mod exclude;
pub mod file;
mod pool;
pub mod repo;
pub mod shebang;

pub use exclude::{AnalyzerOptions, ExcludeFilter};
pub use file::FileCounts;
pub use repo::{LanguageTotals, RepoAnalyzer, Report};
