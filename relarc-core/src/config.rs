//! Resolution of an archive run's configuration.
//!
//! Callers hand over an [`ArchiveRequest`] with whatever they were given;
//! [`ArchiveRequest::resolve`] fills defaults, resolves the version against
//! the project manifest and validates every name that ends up in a path.

use crate::manifest::RetentionOptions;
use crate::path_safety::{validate_component, validate_source_name};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Candidate report files copied into each snapshot, in manifest order.
pub const DEFAULT_SOURCE_FILES: &[&str] = &[
    "release-ready.json",
    "release-ready.md",
    "release-health.json",
    "release-health.md",
    "release-notes.md",
    "release-changelog.json",
    "release-summary.json",
    "release-summary.md",
];

pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
pub const DEFAULT_MAX_SNAPSHOTS_PER_VERSION: usize = 10;

/// Sentinel that asks for the project manifest's version.
pub const CURRENT_VERSION: &str = "current";
pub const PROJECT_MANIFEST: &str = "package.json";

/// Age and count limits for snapshots of one version. Both are at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    retention_days: u32,
    max_snapshots_per_version: usize,
}

impl RetentionPolicy {
    pub fn new(retention_days: u32, max_snapshots_per_version: usize) -> Self {
        Self {
            retention_days: retention_days.max(1),
            max_snapshots_per_version: max_snapshots_per_version.max(1),
        }
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    pub fn max_snapshots_per_version(&self) -> usize {
        self.max_snapshots_per_version
    }

    pub fn options(&self) -> RetentionOptions {
        RetentionOptions {
            retention_days: self.retention_days,
            max_snapshots_per_version: self.max_snapshots_per_version,
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_DAYS, DEFAULT_MAX_SNAPSHOTS_PER_VERSION)
    }
}

/// How the caller asked for the version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionSpec {
    Explicit(String),
    Current,
    Unspecified,
}

impl VersionSpec {
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            None | Some("") => VersionSpec::Unspecified,
            Some(CURRENT_VERSION) => VersionSpec::Current,
            Some(v) => VersionSpec::Explicit(v.to_string()),
        }
    }
}

/// Read the `version` field of `<root>/package.json`, if any.
pub fn project_version(root: &Path) -> Result<Option<String>> {
    let path = root.join(PROJECT_MANIFEST);
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    let doc: serde_json::Value =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    Ok(doc
        .get("version")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string))
}

pub fn resolve_version(spec: &VersionSpec, root: &Path) -> Result<String> {
    match spec {
        VersionSpec::Explicit(v) => Ok(v.clone()),
        VersionSpec::Current => match project_version(root)? {
            Some(v) => Ok(v),
            None => bail!(
                "version 'current' requested but {} has no version field",
                root.join(PROJECT_MANIFEST).display()
            ),
        },
        VersionSpec::Unspecified => match project_version(root)? {
            Some(v) => Ok(v),
            None => bail!(
                "no version given and {} has no version field",
                root.join(PROJECT_MANIFEST).display()
            ),
        },
    }
}

/// UTC `YYYYMMDD_HHMMSS`; lexicographic order is chronological order.
pub fn new_snapshot_id() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Unresolved inputs of an archive run.
#[derive(Clone, Debug, Default)]
pub struct ArchiveRequest {
    pub root: PathBuf,
    pub artifacts_dir: Option<PathBuf>,
    pub version: Option<String>,
    pub tag: Option<String>,
    pub snapshot_id: Option<String>,
    pub retention_days: Option<u32>,
    pub max_snapshots_per_version: Option<usize>,
    /// Replaces [`DEFAULT_SOURCE_FILES`] when non-empty.
    pub source_files: Vec<String>,
}

/// Fully resolved configuration consumed by the archive core.
#[derive(Clone, Debug)]
pub struct ArchiveConfig {
    pub root: PathBuf,
    pub artifacts_dir: PathBuf,
    pub version: String,
    pub tag: String,
    pub snapshot_id: String,
    pub retention: RetentionPolicy,
    pub source_files: Vec<String>,
}

impl ArchiveRequest {
    pub fn resolve(self) -> Result<ArchiveConfig> {
        let version =
            resolve_version(&VersionSpec::from_flag(self.version.as_deref()), &self.root)?;
        validate_component("version", &version)?;

        let snapshot_id = match self.snapshot_id.filter(|s| !s.trim().is_empty()) {
            Some(id) => id,
            None => new_snapshot_id(),
        };
        validate_component("snapshot id", &snapshot_id)?;

        let tag = match self.tag.filter(|t| !t.trim().is_empty()) {
            Some(t) => t,
            None => format!("v{version}"),
        };

        let source_files: Vec<String> = if self.source_files.is_empty() {
            DEFAULT_SOURCE_FILES.iter().map(|s| s.to_string()).collect()
        } else {
            self.source_files
        };
        for name in &source_files {
            validate_source_name(name).with_context(|| format!("source file {name:?}"))?;
        }

        let artifacts_dir =
            self.artifacts_dir.unwrap_or_else(|| self.root.join(DEFAULT_ARTIFACTS_DIR));
        let retention = RetentionPolicy::new(
            self.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS),
            self.max_snapshots_per_version.unwrap_or(DEFAULT_MAX_SNAPSHOTS_PER_VERSION),
        );

        Ok(ArchiveConfig {
            root: self.root,
            artifacts_dir,
            version,
            tag,
            snapshot_id,
            retention,
            source_files,
        })
    }
}
