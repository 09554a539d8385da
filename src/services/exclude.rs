//! Exclusion filter: basename glob matching with built-in defaults.
//!
//! User patterns are unioned with a default set covering VCS metadata,
//! dependency trees, IDE state and lockfiles. Matching is against the
//! basename only; a matching directory prunes its entire subtree.

use glob::Pattern;
use serde::Deserialize;

/// User-supplied analyzer options, as received from the HTTP layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    pub exclude_file_patterns: Vec<String>,
    pub exclude_dir_patterns: Vec<String>,
}

const DEFAULT_DIR_PATTERNS: &[&str] = &[
    ".git",
    "node_modules",
    ".idea",
    ".vscode",
    ".venv",
    ".gradle",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    ".tox",
];

const DEFAULT_FILE_PATTERNS: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pipfile.lock",
    "Gemfile.lock",
    "composer.lock",
    "Cargo.lock",
    "*.log",
    "*.tmp",
    "*.swp",
    "*.swo",
    "*.iml",
    ".DS_Store",
    "thumbs.db",
    "*.class",
    "*.pyc",
    "*.pyo",
    "*.lock",
];

/// One pattern, kept in both raw and compiled form. A raw pattern that
/// fails to compile still participates in exact-literal matching, so
/// names like `a[1].txt` can be excluded verbatim.
#[derive(Debug)]
struct NamePattern {
    raw: String,
    compiled: Option<Pattern>,
}

impl NamePattern {
    fn new(raw: &str) -> Self {
        let compiled = match Pattern::new(raw) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                tracing::warn!(pattern = raw, %err, "skipping malformed exclude pattern");
                None
            }
        };

        Self {
            raw: raw.to_string(),
            compiled,
        }
    }

    fn glob_matches(&self, name: &str) -> bool {
        self.compiled
            .as_ref()
            .is_some_and(|pattern| pattern.matches(name))
    }
}

/// Compiled union of user patterns and built-in defaults.
#[derive(Debug)]
pub struct ExcludeFilter {
    files: Vec<NamePattern>,
    dirs: Vec<NamePattern>,
}

impl ExcludeFilter {
    #[must_use]
    pub fn new(options: &AnalyzerOptions) -> Self {
        let files = options
            .exclude_file_patterns
            .iter()
            .map(String::as_str)
            .chain(DEFAULT_FILE_PATTERNS.iter().copied())
            .map(NamePattern::new)
            .collect();

        let dirs = options
            .exclude_dir_patterns
            .iter()
            .map(String::as_str)
            .chain(DEFAULT_DIR_PATTERNS.iter().copied())
            .map(NamePattern::new)
            .collect();

        Self { files, dirs }
    }

    /// True when a file basename matches any pattern, or exactly equals a
    /// pattern literal.
    #[must_use]
    pub fn excludes_file(&self, name: &str) -> bool {
        self.files
            .iter()
            .any(|pattern| pattern.glob_matches(name) || pattern.raw == name)
    }

    /// True when a directory basename matches any directory pattern; the
    /// caller prunes the whole subtree.
    #[must_use]
    pub fn excludes_dir(&self, name: &str) -> bool {
        self.dirs.iter().any(|pattern| pattern.glob_matches(name))
    }
}

impl Default for ExcludeFilter {
    fn default() -> Self {
        Self::new(&AnalyzerOptions::default())
    }
}
