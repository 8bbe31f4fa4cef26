use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ArchiveConfig;
use crate::digest::{copy_with_digest, file_digest};
use crate::layout::{self, display_path};
use crate::manifest::{CopiedFile, SnapshotManifest, MANIFEST_SCHEMA};
use crate::path_safety::{resolve_contained_file, validate_source_name};

/// What the copy stage found for the allow-list, in allow-list order.
#[derive(Clone, Debug, Default)]
pub struct CopyOutcome {
    pub copied_files: Vec<CopiedFile>,
    pub missing_files: Vec<String>,
}

pub struct SnapshotWriter;

impl SnapshotWriter {
    /// Create (or recreate, when the id is reused) the snapshot directory.
    pub fn prepare(archive_root: &Path, version: &str, snapshot_id: &str) -> Result<PathBuf> {
        let dir = layout::snapshot_dir(archive_root, version, snapshot_id);
        if dir.exists() {
            tracing::warn!(
                version,
                snapshot_id,
                "snapshot id already exists; overwriting previous snapshot"
            );
            fs::remove_dir_all(&dir).with_context(|| format!("clear {}", dir.display()))?;
        }
        fs::create_dir_all(&dir).with_context(|| format!("create dir {}", dir.display()))?;
        Ok(dir)
    }

    /// Copy every allow-listed file that exists under `artifacts_dir`.
    ///
    /// Absent names are recorded as missing; an I/O failure on a file that
    /// does exist aborts the stage.
    pub fn copy_sources(
        artifacts_dir: &Path,
        snapshot_dir: &Path,
        names: &[String],
    ) -> Result<CopyOutcome> {
        let mut outcome = CopyOutcome::default();
        for name in names {
            let rel = validate_source_name(name)?;
            let Some(src) = resolve_contained_file(artifacts_dir, &rel)? else {
                tracing::debug!(file = %name, "source file missing");
                outcome.missing_files.push(name.clone());
                continue;
            };
            outcome.copied_files.push(copy_one(&src, snapshot_dir, &rel)?);
        }
        Ok(outcome)
    }

    pub fn build_manifest(
        cfg: &ArchiveConfig,
        archive_root: &Path,
        snapshot_dir: &Path,
        copy: &CopyOutcome,
    ) -> SnapshotManifest {
        SnapshotManifest {
            schema: MANIFEST_SCHEMA.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            root: display_path(&cfg.root),
            artifacts_dir: display_path(&cfg.artifacts_dir),
            archive_root: display_path(archive_root),
            version: cfg.version.clone(),
            tag: cfg.tag.clone(),
            snapshot_id: cfg.snapshot_id.clone(),
            snapshot_dir: display_path(snapshot_dir),
            copied_files: copy.copied_files.clone(),
            missing_files: copy.missing_files.clone(),
            options: cfg.retention.options(),
        }
    }

    pub fn write_manifest(snapshot_dir: &Path, manifest: &SnapshotManifest) -> Result<PathBuf> {
        let path = snapshot_dir.join(layout::MANIFEST_FILE);
        layout::write_json(&path, manifest).context("write manifest.json")?;
        Ok(path)
    }
}

fn copy_one(src: &Path, snapshot_dir: &Path, rel: &Path) -> Result<CopiedFile> {
    let dst = snapshot_dir.join(rel);
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let (bytes, sha256) = copy_with_digest(src, &dst)?;
    // Re-read what landed on disk; the manifest only ever records verified bytes.
    let (on_disk_bytes, on_disk_sha) = file_digest(&dst)?;
    if on_disk_bytes != bytes || on_disk_sha != sha256 {
        bail!("copy of {} is corrupt (expected {}, found {})", src.display(), sha256, on_disk_sha);
    }
    let file = display_path(rel);
    tracing::debug!(%file, bytes, "copied");
    Ok(CopiedFile { file, bytes, sha256 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_in_allow_list_order_and_preserves_subpaths() {
        let td = tempfile::tempdir().unwrap();
        let artifacts = td.path().join("artifacts");
        fs::create_dir_all(artifacts.join("nested")).unwrap();
        fs::write(artifacts.join("b.json"), b"{\"b\":1}").unwrap();
        fs::write(artifacts.join("nested/a.md"), b"# a").unwrap();

        let snap = SnapshotWriter::prepare(&td.path().join("archive"), "1.0.0", "20260101_000000")
            .unwrap();
        let names: Vec<String> =
            ["b.json", "absent.json", "nested/a.md"].iter().map(|s| s.to_string()).collect();
        let out = SnapshotWriter::copy_sources(&artifacts, &snap, &names).unwrap();

        let files: Vec<&str> = out.copied_files.iter().map(|c| c.file.as_str()).collect();
        assert_eq!(files, vec!["b.json", "nested/a.md"]);
        assert_eq!(out.missing_files, vec!["absent.json".to_string()]);
        assert!(snap.join("nested/a.md").is_file());
        assert_eq!(out.copied_files[0].bytes, 7);
    }

    #[test]
    fn directories_are_not_sources() {
        let td = tempfile::tempdir().unwrap();
        let artifacts = td.path().join("artifacts");
        fs::create_dir_all(artifacts.join("release-ready.json")).unwrap();
        let snap = SnapshotWriter::prepare(&td.path().join("archive"), "1.0.0", "x").unwrap();
        let out =
            SnapshotWriter::copy_sources(&artifacts, &snap, &["release-ready.json".to_string()])
                .unwrap();
        assert!(out.copied_files.is_empty());
        assert_eq!(out.missing_files.len(), 1);
    }

    #[test]
    fn prepare_clears_a_reused_snapshot_id() {
        let td = tempfile::tempdir().unwrap();
        let root = td.path().join("archive");
        let dir = SnapshotWriter::prepare(&root, "1.0.0", "20260101_000000").unwrap();
        fs::write(dir.join("stale.json"), b"old").unwrap();
        let again = SnapshotWriter::prepare(&root, "1.0.0", "20260101_000000").unwrap();
        assert_eq!(dir, again);
        assert!(!again.join("stale.json").exists());
    }
}
