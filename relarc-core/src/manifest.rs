use serde::{Deserialize, Serialize};

pub const MANIFEST_SCHEMA: &str = "release-archive-manifest/v1";
pub const LATEST_SCHEMA: &str = "release-archive-latest/v1";
pub const CATALOG_SCHEMA: &str = "release-archive-catalog/v1";

/// Retention options in effect when a snapshot was written.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetentionOptions {
    pub retention_days: u32,
    pub max_snapshots_per_version: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CopiedFile {
    pub file: String,
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotManifest {
    pub schema: String,
    pub generated_at: String,
    pub root: String,
    pub artifacts_dir: String,
    pub archive_root: String,
    pub version: String,
    pub tag: String,
    pub snapshot_id: String,
    pub snapshot_dir: String,
    pub copied_files: Vec<CopiedFile>,
    pub missing_files: Vec<String>,
    pub options: RetentionOptions,
}

/// Per-version pointer; an empty `latest_snapshot_id` means no surviving snapshots.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LatestPointer {
    pub schema: String,
    pub version: String,
    pub latest_snapshot_id: String,
    pub latest_snapshot_dir: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub version: String,
    pub latest_snapshot_id: String,
    pub snapshot_count: usize,
    pub snapshots: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub schema: String,
    pub generated_at: String,
    pub archive_root: String,
    pub versions: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn empty(archive_root: &str) -> Self {
        Self {
            schema: CATALOG_SCHEMA.to_string(),
            generated_at: String::new(),
            archive_root: archive_root.to_string(),
            versions: Vec::new(),
        }
    }
}
