//! Analysis inputs
//!
//! An [`InputUnit`] is what becomes one row of output: a single file, a group
//! of files counted together, or a piece of text given directly.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputUnit {
    File(PathBuf),
    /// Files analysed separately and reported as their sum
    Combined(Vec<PathBuf>),
    Text(String),
}

impl InputUnit {
    /// Identifier used for the unit's counter and in diagnostics
    pub fn identifier(&self) -> String {
        match self {
            InputUnit::File(path) => path.display().to_string(),
            InputUnit::Combined(paths) => paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join("+"),
            InputUnit::Text(_) => "cmdline_text".to_string(),
        }
    }
}

impl fmt::Display for InputUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

/// Expand glob patterns into file paths
///
/// Each pattern's files are sorted for deterministic results; a pattern with
/// no glob characters that names an existing file is kept as is.
pub fn expand_globs<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>, glob::PatternError> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let mut matched: Vec<PathBuf> = glob::glob(pattern.as_ref())?
            .filter_map(Result::ok)
            .filter(|path| path.is_file())
            .collect();
        matched.sort();
        paths.extend(matched);
    }
    Ok(paths)
}

/// One unit per file, or a single combined unit
pub fn units_from_paths(paths: Vec<PathBuf>, combine: bool) -> Vec<InputUnit> {
    if combine && !paths.is_empty() {
        vec![InputUnit::Combined(paths)]
    } else {
        paths.into_iter().map(InputUnit::File).collect()
    }
}

/// Read a plain text input
pub fn read_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    };
    // Drop a byte order mark
    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}
