//! Language registry loaded from the JSON table asset.
//!
//! The table ships next to the executable as `languages.json`: an array of
//! `{"name", "extensions", "lineComment", "blockComment"}` entries.
//! The registry is built once at startup and is read-only afterwards; it is
//! shared as an `Arc` so analyzers never need a lock.

use crate::error::RegistryError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Catch-all language for unknown or missing extensions.
pub const OTHER_LANGUAGE: &str = "Other";

/// Reserved aggregate name. Never present in the table; the aggregator
/// filters it defensively.
pub const TOTAL_NAME: &str = "TOTAL";

/// File name of the language table asset.
pub const ASSET_FILE: &str = "languages.json";

/// One language entry as it appears in the JSON asset.
///
/// Missing fields default to empty sequences, so a language without block
/// comments simply omits the key.
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageData {
    pub name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default, rename = "lineComment")]
    pub line_comments: Vec<String>,
    #[serde(default, rename = "blockComment")]
    pub block_comments: Vec<(String, String)>,
}

/// Extension and comment-marker lookups over the loaded table.
#[derive(Debug)]
pub struct LanguageRegistry {
    by_name: HashMap<String, LanguageData>,
    name_by_ext: HashMap<String, String>,
}

impl LanguageRegistry {
    /// Loads the registry from a JSON asset on disk.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::MissingAsset` when the file cannot be read,
    /// `RegistryError::Malformed` when it is not a valid language table and
    /// `RegistryError::Empty` when it parses but defines nothing. All three
    /// are fatal at startup.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let bytes = fs::read(path).map_err(|source| RegistryError::MissingAsset {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&bytes, path)
    }

    /// Builds the registry from raw JSON bytes. `path` is only used for
    /// error provenance.
    pub fn from_slice(bytes: &[u8], path: &Path) -> Result<Self, RegistryError> {
        let table: Vec<LanguageData> =
            serde_json::from_slice(bytes).map_err(|source| RegistryError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        if table.is_empty() {
            return Err(RegistryError::Empty {
                path: path.to_path_buf(),
            });
        }

        let mut by_name = HashMap::with_capacity(table.len());
        let mut name_by_ext = HashMap::new();

        for entry in table {
            for ext in &entry.extensions {
                // Duplicate extensions resolve to the first-seen mapping.
                name_by_ext
                    .entry(ext.clone())
                    .or_insert_with(|| entry.name.clone());
            }
            by_name.insert(entry.name.clone(), entry);
        }

        Ok(Self {
            by_name,
            name_by_ext,
        })
    }

    /// Resolves a file extension to a language name.
    ///
    /// A leading `.` is stripped. Empty or unknown extensions resolve to
    /// [`OTHER_LANGUAGE`]. Lookup is case-sensitive, matching the table.
    #[must_use]
    pub fn language_by_extension<'a>(&'a self, ext: &str) -> &'a str {
        let ext = ext.strip_prefix('.').unwrap_or(ext);

        if ext.is_empty() {
            return OTHER_LANGUAGE;
        }

        self.name_by_ext
            .get(ext)
            .map_or(OTHER_LANGUAGE, String::as_str)
    }

    /// Line-comment prefixes for a language; empty for unknown names.
    #[must_use]
    pub fn line_comments(&self, name: &str) -> &[String] {
        self.by_name
            .get(name)
            .map_or(&[], |data| data.line_comments.as_slice())
    }

    /// Block-comment (open, close) pairs for a language; empty for unknown
    /// names.
    #[must_use]
    pub fn block_comments(&self, name: &str) -> &[(String, String)] {
        self.by_name
            .get(name)
            .map_or(&[], |data| data.block_comments.as_slice())
    }

    /// All language names in the table, in no particular order.
    pub fn all_languages(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Resolves the default asset path: next to the executable if present,
/// otherwise the current directory.
#[must_use]
pub fn default_asset_path() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate = dir.join(ASSET_FILE);
            if candidate.is_file() {
                return candidate;
            }
        }
    }

    PathBuf::from(ASSET_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipped() -> LanguageRegistry {
        let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/languages.json"));
        LanguageRegistry::load(path).unwrap()
    }

    #[test]
    fn test_language_by_extension() {
        let registry = shipped();
        for (ext, want) in [
            ("java", "Java"),
            ("py", "Python"),
            ("js", "JavaScript"),
            ("go", "Go"),
            ("cpp", "C++"),
        ] {
            assert_eq!(registry.language_by_extension(ext), want);
        }
    }

    #[test]
    fn test_leading_dot_is_stripped() {
        let registry = shipped();
        assert_eq!(registry.language_by_extension(".rs"), "Rust");
    }

    #[test]
    fn test_unknown_and_empty_extensions_are_other() {
        let registry = shipped();
        assert_eq!(registry.language_by_extension(""), OTHER_LANGUAGE);
        assert_eq!(registry.language_by_extension("xyzzy"), OTHER_LANGUAGE);
        // Case-sensitive: the table stores lowercase extensions.
        assert_eq!(registry.language_by_extension("PY"), OTHER_LANGUAGE);
    }

    #[test]
    fn test_line_comment_markers() {
        let registry = shipped();
        assert_eq!(registry.line_comments("Python"), ["#"]);
        assert_eq!(registry.line_comments("Java"), ["//"]);
        assert_eq!(registry.line_comments("Lua"), ["--"]);
        assert!(registry.line_comments("NoSuchLanguage").is_empty());
    }

    #[test]
    fn test_block_comment_markers() {
        let registry = shipped();
        let pair = |open: &str, close: &str| (open.to_string(), close.to_string());
        assert_eq!(
            registry.block_comments("Python"),
            [pair("\"\"\"", "\"\"\"")]
        );
        assert_eq!(registry.block_comments("Java"), [pair("/*", "*/")]);
        assert_eq!(registry.block_comments("HTML"), [pair("<!--", "-->")]);
        assert_eq!(registry.block_comments("Haskell"), [pair("{-", "-}")]);
    }

    #[test]
    fn test_duplicate_extensions_first_seen_wins() {
        let json = br#"[
            {"name": "First", "extensions": ["x"]},
            {"name": "Second", "extensions": ["x", "y"]}
        ]"#;
        let registry = LanguageRegistry::from_slice(json, Path::new("inline")).unwrap();
        assert_eq!(registry.language_by_extension("x"), "First");
        assert_eq!(registry.language_by_extension("y"), "Second");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let json = br#"[{"name": "Bare", "extensions": ["bare"]}]"#;
        let registry = LanguageRegistry::from_slice(json, Path::new("inline")).unwrap();
        assert!(registry.line_comments("Bare").is_empty());
        assert!(registry.block_comments("Bare").is_empty());
    }

    #[test]
    fn test_malformed_table_is_an_error() {
        let err = LanguageRegistry::from_slice(b"{not json", Path::new("inline")).unwrap_err();
        assert_eq!(err.code(), "REGISTRY_MALFORMED");
    }

    #[test]
    fn test_empty_table_is_an_error() {
        let err = LanguageRegistry::from_slice(b"[]", Path::new("inline")).unwrap_err();
        assert_eq!(err.code(), "REGISTRY_EMPTY");
    }

    #[test]
    fn test_total_is_never_a_language() {
        let registry = shipped();
        assert!(registry.all_languages().all(|name| name != TOTAL_NAME));
    }
}
