//! Shebang resolution: map a `#!` first line to a language extension.
//!
//! Used by the file analyzer to override the extension-based guess for
//! scripts whose file name carries no (or a misleading) extension.

/// Interpreters whose conventional file extension differs from the
/// interpreter name itself.
fn interpreter_extension(name: &str) -> Option<&'static str> {
    let ext = match name {
        "node" => "js",
        "python" | "python3" => "py",
        "perl" => "pl",
        "ruby" => "rb",
        "make" => "make",
        "rc" => "plan9sh",
        "gosh" => "scm",
        "escript" => "erl",
        _ => return None,
    };
    Some(ext)
}

/// Resolves the first line of a file to a language extension (without a
/// leading dot).
///
/// Returns `None` when the line is not a shebang or names no interpreter.
/// A two-field shebang (`#!/usr/bin/env python3`) resolves through its
/// argument; any other shape resolves through the basename of the
/// interpreter path. Names outside the well-known table are returned
/// verbatim and left to the registry: `#!/usr/bin/env zsh` yields `zsh`.
#[must_use]
pub fn extension_for_shebang(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("#!")?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let first = *fields.first()?;

    if fields.len() == 2 {
        let interpreter = fields[1];
        return Some(interpreter_extension(interpreter).unwrap_or(interpreter));
    }

    let base = first.rsplit('/').next().unwrap_or(first);
    Some(interpreter_extension(base).unwrap_or(base))
}
