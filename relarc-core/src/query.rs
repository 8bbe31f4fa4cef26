//! Read-side queries over a persisted archive.
//!
//! Every query is answered from `catalog.json`, `latest.json` or a snapshot's
//! `manifest.json` alone; nothing here writes to the archive. Unreadable
//! index files are treated as absent.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::layout::{self, display_path};
use crate::manifest::{Catalog, CatalogEntry, LatestPointer, SnapshotManifest};
use crate::path_safety::validate_component;

pub const QUERY_SCHEMA: &str = "release-archive-query/v1";
pub const DEFAULT_QUERY_LIMIT: usize = 20;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum QueryMode {
    Versions,
    VersionLatest,
    Snapshot,
}

#[derive(Clone, Debug, Default)]
pub struct Query {
    pub version: Option<String>,
    pub snapshot_id: Option<String>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn mode(&self) -> QueryMode {
        match (&self.version, &self.snapshot_id) {
            (Some(_), Some(_)) => QueryMode::Snapshot,
            (Some(_), None) => QueryMode::VersionLatest,
            (None, _) => QueryMode::Versions,
        }
    }

    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_QUERY_LIMIT).max(1)
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionLatestView {
    pub version: String,
    pub latest_snapshot_id: String,
    pub latest_snapshot_dir: String,
    pub snapshots: Vec<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView {
    pub version: String,
    pub snapshot_id: String,
    pub snapshot_dir: String,
    pub copied_files: usize,
    pub missing_files: usize,
    pub tag: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum QueryResult {
    Versions { versions: Vec<CatalogEntry> },
    VersionLatest(VersionLatestView),
    Snapshot(SnapshotView),
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueryReport {
    pub schema: String,
    pub generated_at: String,
    pub archive_root: String,
    pub mode: QueryMode,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub result: Option<QueryResult>,
}

impl QueryReport {
    fn new(archive_root: &Path, mode: QueryMode) -> Self {
        Self {
            schema: QUERY_SCHEMA.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            archive_root: display_path(archive_root),
            mode,
            ok: false,
            error: None,
            result: None,
        }
    }

    fn success(mut self, result: QueryResult) -> Self {
        self.ok = true;
        self.result = Some(result);
        self
    }

    fn failure(mut self, error: String) -> Self {
        self.ok = false;
        self.error = Some(error);
        self
    }
}

/// Answer `query` against the archive at `archive_root`.
///
/// The mode follows the identifiers supplied; a snapshot id without a
/// version is a versions listing. Lookup misses come back as `ok == false`
/// reports. `Err` is reserved for malformed identifiers.
pub fn run_query(archive_root: &Path, query: &Query) -> Result<QueryReport> {
    if let Some(v) = &query.version {
        validate_component("version", v)?;
    }
    if let Some(id) = &query.snapshot_id {
        validate_component("snapshot id", id)?;
    }

    let report = QueryReport::new(archive_root, query.mode());
    let limit = query.limit();
    let out = match (&query.version, &query.snapshot_id) {
        (None, _) => {
            report.success(QueryResult::Versions { versions: versions(archive_root, limit) })
        }
        (Some(version), None) => match version_latest(archive_root, version, limit) {
            Some(view) => report.success(QueryResult::VersionLatest(view)),
            None => report.failure(format!("version '{version}' has no snapshots")),
        },
        (Some(version), Some(snapshot_id)) => match snapshot(archive_root, version, snapshot_id) {
            Some(view) => report.success(QueryResult::Snapshot(view)),
            None => report.failure(format!("manifest not found for {version}/{snapshot_id}")),
        },
    };
    tracing::debug!(mode = ?out.mode, ok = out.ok, "query answered");
    Ok(out)
}

fn versions(archive_root: &Path, limit: usize) -> Vec<CatalogEntry> {
    let catalog: Catalog = layout::read_json_opt(&layout::catalog_path(archive_root))
        .unwrap_or_else(|| Catalog::empty(&display_path(archive_root)));
    catalog.versions.into_iter().take(limit).collect()
}

fn version_latest(archive_root: &Path, version: &str, limit: usize) -> Option<VersionLatestView> {
    let pointer: LatestPointer =
        layout::read_json_opt(&layout::latest_path(archive_root, version))?;
    if pointer.latest_snapshot_id.is_empty() {
        return None;
    }
    let snapshots = layout::list_subdirs_desc(&layout::version_dir(archive_root, version))
        .unwrap_or_default()
        .into_iter()
        .take(limit)
        .collect();
    Some(VersionLatestView {
        version: version.to_string(),
        latest_snapshot_id: pointer.latest_snapshot_id,
        latest_snapshot_dir: pointer.latest_snapshot_dir,
        snapshots,
    })
}

fn snapshot(archive_root: &Path, version: &str, snapshot_id: &str) -> Option<SnapshotView> {
    let manifest: SnapshotManifest =
        layout::read_json_opt(&layout::manifest_path(archive_root, version, snapshot_id))?;
    Some(SnapshotView {
        version: version.to_string(),
        snapshot_id: snapshot_id.to_string(),
        snapshot_dir: display_path(&layout::snapshot_dir(archive_root, version, snapshot_id)),
        copied_files: manifest.copied_files.len(),
        missing_files: manifest.missing_files.len(),
        tag: manifest.tag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_follows_supplied_identifiers() {
        let q = Query::default();
        assert_eq!(q.mode(), QueryMode::Versions);
        let q = Query { version: Some("1.0.0".into()), ..Default::default() };
        assert_eq!(q.mode(), QueryMode::VersionLatest);
        let q = Query {
            version: Some("1.0.0".into()),
            snapshot_id: Some("20260101_000000".into()),
            ..Default::default()
        };
        assert_eq!(q.mode(), QueryMode::Snapshot);
    }

    #[test]
    fn missing_catalog_is_an_empty_listing() {
        let td = tempfile::tempdir().unwrap();
        let r = run_query(td.path(), &Query::default()).unwrap();
        assert!(r.ok);
        assert_eq!(r.result, Some(QueryResult::Versions { versions: vec![] }));
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["mode"], "versions");
        assert!(v.get("error").is_none());
        assert_eq!(v["versions"], serde_json::json!([]));
    }

    #[test]
    fn snapshot_id_without_version_lists_versions() {
        let td = tempfile::tempdir().unwrap();
        let q = Query { snapshot_id: Some("20260101_000000".into()), ..Default::default() };
        assert_eq!(q.mode(), QueryMode::Versions);
        let r = run_query(td.path(), &q).unwrap();
        assert!(r.ok);
        assert_eq!(r.mode, QueryMode::Versions);
        assert_eq!(r.result, Some(QueryResult::Versions { versions: vec![] }));
    }

    #[test]
    fn manifest_miss_reports_the_pair() {
        let td = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(td.path().join("1.0.0/20260101_000000")).unwrap();
        let q = Query {
            version: Some("1.0.0".into()),
            snapshot_id: Some("20260101_000000".into()),
            ..Default::default()
        };
        let r = run_query(td.path(), &q).unwrap();
        assert!(!r.ok);
        assert_eq!(r.error.as_deref(), Some("manifest not found for 1.0.0/20260101_000000"));
    }
}
