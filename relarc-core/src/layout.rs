//! On-disk layout of the archive and the small JSON I/O helpers shared by the
//! writer, the index maintainer and the reader.
//!
//! ```text
//! <artifacts>/release-archive/
//!   catalog.json
//!   <version>/latest.json
//!   <version>/<snapshot_id>/manifest.json
//! ```

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const ARCHIVE_DIR: &str = "release-archive";
pub const CATALOG_FILE: &str = "catalog.json";
pub const LATEST_FILE: &str = "latest.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const LOCK_FILE: &str = ".lock";

pub fn archive_root(artifacts_dir: &Path) -> PathBuf {
    artifacts_dir.join(ARCHIVE_DIR)
}

pub fn version_dir(archive_root: &Path, version: &str) -> PathBuf {
    archive_root.join(version)
}

pub fn snapshot_dir(archive_root: &Path, version: &str, snapshot_id: &str) -> PathBuf {
    version_dir(archive_root, version).join(snapshot_id)
}

pub fn catalog_path(archive_root: &Path) -> PathBuf {
    archive_root.join(CATALOG_FILE)
}

pub fn latest_path(archive_root: &Path, version: &str) -> PathBuf {
    version_dir(archive_root, version).join(LATEST_FILE)
}

pub fn manifest_path(archive_root: &Path, version: &str, snapshot_id: &str) -> PathBuf {
    snapshot_dir(archive_root, version, snapshot_id).join(MANIFEST_FILE)
}

/// Names of the immediate subdirectories of `dir`, newest first.
///
/// Snapshot ids sort chronologically, so a descending name sort is a
/// descending time sort. Files (`latest.json`, `catalog.json`, the lock file)
/// are never listed. A missing `dir` yields an empty list.
pub fn list_subdirs_desc(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for ent in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let ent = ent.with_context(|| format!("list {}", dir.display()))?;
        if !ent.file_type().is_dir() {
            continue;
        }
        if let Some(name) = ent.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort_unstable_by(|a, b| b.cmp(a));
    Ok(names)
}

/// Write `value` as pretty JSON terminated by a newline, creating parent dirs.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let mut text = serde_json::to_string_pretty(value).context("serialize json")?;
    text.push('\n');
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Read an optional JSON document. Missing or unparsable files are `None`.
pub fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(_) => return None,
    };
    match serde_json::from_slice(&bytes) {
        Ok(v) => Some(v),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "ignoring unreadable index file");
            None
        }
    }
}

/// Path rendered the way it is persisted in documents.
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
