//! Derived indexes: the per-version `latest.json` pointer and the global
//! `catalog.json`.
//!
//! Both are recomputed from a directory scan after every mutation. Nothing
//! here patches an existing index in place.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::layout::{self, display_path};
use crate::manifest::{Catalog, CatalogEntry, LatestPointer, CATALOG_SCHEMA, LATEST_SCHEMA};

/// Pointer for `version` computed from the snapshot directories on disk.
pub fn compute_latest(archive_root: &Path, version: &str) -> Result<LatestPointer> {
    let version_dir = layout::version_dir(archive_root, version);
    let survivors = layout::list_subdirs_desc(&version_dir)?;
    let (latest_snapshot_id, latest_snapshot_dir) = match survivors.first() {
        Some(id) => (id.clone(), display_path(&version_dir.join(id))),
        None => (String::new(), String::new()),
    };
    Ok(LatestPointer {
        schema: LATEST_SCHEMA.to_string(),
        version: version.to_string(),
        latest_snapshot_id,
        latest_snapshot_dir,
    })
}

pub fn write_latest(archive_root: &Path, version: &str) -> Result<(PathBuf, LatestPointer)> {
    let pointer = compute_latest(archive_root, version)?;
    let path = layout::latest_path(archive_root, version);
    layout::write_json(&path, &pointer).context("write latest.json")?;
    tracing::debug!(version, latest = %pointer.latest_snapshot_id, "latest pointer updated");
    Ok((path, pointer))
}

/// Full scan of every version directory under `archive_root`, versions
/// sorted by name descending, snapshots newest first.
pub fn scan_archive_root(archive_root: &Path) -> Result<Catalog> {
    let mut versions = Vec::new();
    for version in layout::list_subdirs_desc(archive_root)? {
        let snapshots = layout::list_subdirs_desc(&layout::version_dir(archive_root, &version))?;
        versions.push(CatalogEntry {
            latest_snapshot_id: snapshots.first().cloned().unwrap_or_default(),
            snapshot_count: snapshots.len(),
            snapshots,
            version,
        });
    }
    Ok(Catalog {
        schema: CATALOG_SCHEMA.to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        archive_root: display_path(archive_root),
        versions,
    })
}

pub fn rebuild_catalog(archive_root: &Path) -> Result<(PathBuf, Catalog)> {
    let catalog = scan_archive_root(archive_root)?;
    let path = layout::catalog_path(archive_root);
    layout::write_json(&path, &catalog).context("write catalog.json")?;
    tracing::info!(versions = catalog.versions.len(), "catalog rebuilt");
    Ok((path, catalog))
}
