//! File scanning utilities for discovering model files

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub struct FileScanner;

impl FileScanner {
    /// Check if a file has a model file extension
    pub fn is_model_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext, "json" | "yml" | "yaml"))
            .unwrap_or(false)
    }

    pub fn is_json_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }

    /// Model files under `path`, sorted by name. A file path is returned as is,
    /// whatever its extension.
    pub fn scan(path: &Path) -> Result<Vec<PathBuf>> {
        if path.is_file() {
            return Ok(vec![path.to_path_buf()]);
        }
        if !path.is_dir() {
            bail!("No such file or directory: {}", path.display());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to scan {}", path.display()))?;
            if entry.file_type().is_file() && Self::is_model_file(entry.path()) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }
}
