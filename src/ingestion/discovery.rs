//! Input discovery.

use std::path::{Path, PathBuf};

use crate::error::{IngestionError, IngestionResult};

/// Recursively find files under `root` whose extension is `extension` (without the dot).
///
/// Directories that happen to match (e.g. `archive.csv/`) are skipped. Results are sorted so
/// that ingestion order is stable across platforms.
pub fn find_files(root: impl AsRef<Path>, extension: &str) -> IngestionResult<Vec<PathBuf>> {
    let root = root.as_ref();
    let root_str = root.to_str().ok_or_else(|| IngestionError::Discovery {
        message: format!("path is not valid UTF-8 ({})", root.display()),
    })?;
    let extension = extension.trim_start_matches('.');
    let pattern = format!(
        "{}/**/*.{}",
        glob::Pattern::escape(root_str.trim_end_matches(['/', '\\'])),
        glob::Pattern::escape(extension)
    );

    let entries = glob::glob(&pattern).map_err(|e| IngestionError::Discovery {
        message: format!("invalid pattern '{pattern}': {e}"),
    })?;

    let mut out = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| IngestionError::Io(e.into()))?;
        if !path.is_dir() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}
