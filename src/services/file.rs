//! Per-file streaming line counter.
//!
//! A file is read line by line through a large buffer and classified once
//! up front by its extension; a `#!` on the first line can override that
//! guess through the shebang resolver. Comment markers are re-queried from
//! the registry on every line, so an override switches marker sets from
//! line 2 onward.

use crate::registry::LanguageRegistry;
use crate::services::shebang;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Read-buffer size for streaming a file.
const READ_BUFFER_BYTES: usize = 1024 * 1024;

/// Counts for a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCounts {
    /// Resolved language name; "Other" when unknown.
    pub language: String,
    /// 1 for any file with at least one line, 0 for an empty file.
    pub files: u32,
    pub lines: u32,
    pub blank: u32,
    pub comments: u32,
}

impl FileCounts {
    fn new(language: String) -> Self {
        Self {
            language,
            files: 0,
            lines: 0,
            blank: 0,
            comments: 0,
        }
    }
}

/// Counts one file on disk. The language guess comes from the basename
/// extension; unreadable files surface the IO error to the caller, which
/// skips them silently.
pub fn analyze_path(registry: &LanguageRegistry, path: &Path) -> io::Result<FileCounts> {
    let file = File::open(path)?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let language = registry.language_by_extension(ext).to_string();

    analyze_reader(
        registry,
        language,
        BufReader::with_capacity(READ_BUFFER_BYTES, file),
    )
}

/// Counts lines from any buffered reader, starting from an initial
/// language guess.
pub fn analyze_reader<R: BufRead>(
    registry: &LanguageRegistry,
    initial_language: String,
    mut reader: R,
) -> io::Result<FileCounts> {
    let mut counts = FileCounts::new(initial_language);
    let mut first_line = true;
    let mut in_block = false;
    let mut buf = String::with_capacity(256);

    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }

        let line = buf.trim();
        counts.lines += 1;

        if first_line {
            if line.starts_with("#!") {
                if let Some(ext) = shebang::extension_for_shebang(line) {
                    counts.language = registry.language_by_extension(ext).to_string();
                }
            }

            first_line = false;
            counts.files = 1;
        }

        // Blank lines carry no comment credit, even inside a block.
        if line.is_empty() {
            counts.blank += 1;
            continue;
        }

        let block_pairs = registry.block_comments(&counts.language);

        if in_block {
            counts.comments += 1;

            for (_, close) in block_pairs {
                if line.ends_with(close.as_str()) {
                    in_block = false;
                    break;
                }
            }

            // no line-comment or block-open evaluation inside a block
            continue;
        }

        for prefix in registry.line_comments(&counts.language) {
            if line.starts_with(prefix.as_str()) {
                counts.comments += 1;
            }
        }

        for (open, close) in block_pairs {
            if let Some(rest) = line.strip_prefix(open.as_str()) {
                in_block = true;
                counts.comments += 1;

                // opener and closer on the same line
                if rest.ends_with(close.as_str()) {
                    in_block = false;
                }
            }
        }
    }

    Ok(counts)
}
