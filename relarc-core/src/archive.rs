//! One archiving run: copy, manifest, prune, then latest and catalog.
//!
//! Stage failures are folded into the returned [`ArchiveReport`]; only an
//! unusable configuration is returned as `Err`.

use anyhow::Result;
use std::path::Path;

use crate::config::ArchiveConfig;
use crate::index;
use crate::layout::{self, display_path};
use crate::lock;
use crate::report::{
    ArchiveReport, Check, CheckStatus, CheckStatuses, Failure, Standardized,
    ARCHIVE_INDEX_WRITE_FAILED, ARCHIVE_MANIFEST_WRITE_FAILED, ARCHIVE_SOURCE_COPY_FAILED,
    ARCHIVE_SOURCE_FILES_MISSING, REPORT_SCHEMA,
};
use crate::retention::{self, PrunedSnapshot};
use crate::writer::{CopyOutcome, SnapshotWriter};

/// Run the archive pipeline for `cfg`. The caller guarantees a single writer.
pub fn run_archive(cfg: &ArchiveConfig) -> Result<ArchiveReport> {
    let archive_root = layout::archive_root(&cfg.artifacts_dir);
    let snapshot_dir = layout::snapshot_dir(&archive_root, &cfg.version, &cfg.snapshot_id);
    let mut checks = CheckStatuses::default();
    let mut failures: Vec<Failure> = Vec::new();
    let mut copy = CopyOutcome::default();
    let mut error: Option<String> = None;

    tracing::info!(
        version = %cfg.version,
        snapshot_id = %cfg.snapshot_id,
        archive_root = %archive_root.display(),
        "archiving release artifacts"
    );

    // Copy stage.
    let copied = SnapshotWriter::prepare(&archive_root, &cfg.version, &cfg.snapshot_id)
        .and_then(|dir| SnapshotWriter::copy_sources(&cfg.artifacts_dir, &dir, &cfg.source_files));
    match copied {
        Ok(outcome) => {
            copy = outcome;
            if copy.copied_files.is_empty() {
                let msg = format!(
                    "none of the {} candidate report files exist under {}",
                    cfg.source_files.len(),
                    cfg.artifacts_dir.display()
                );
                tracing::warn!("{msg}");
                checks.set(Check::SourceArtifacts, CheckStatus::Fail);
                failures.push(Failure::new(
                    Check::SourceArtifacts,
                    ARCHIVE_SOURCE_FILES_MISSING,
                    msg.clone(),
                    false,
                ));
                error = Some(msg);
            } else {
                checks.set(Check::SourceArtifacts, CheckStatus::Pass);
            }
        }
        Err(err) => {
            let msg = format!("{err:#}");
            checks.set(Check::SourceArtifacts, CheckStatus::Fail);
            failures.push(Failure::new(
                Check::SourceArtifacts,
                ARCHIVE_SOURCE_COPY_FAILED,
                msg.clone(),
                true,
            ));
            discard_partial_snapshot(&snapshot_dir);
            error = Some(msg);
            refresh_indexes(&archive_root, &cfg.version, &mut checks, &mut failures, &mut error);
            return Ok(finish(cfg, &archive_root, copy, Vec::new(), checks, failures, error));
        }
    }

    // Manifest stage; written even when nothing was copied.
    let manifest = SnapshotWriter::build_manifest(cfg, &archive_root, &snapshot_dir, &copy);
    match SnapshotWriter::write_manifest(&snapshot_dir, &manifest) {
        Ok(path) => {
            checks.set(Check::SnapshotManifest, CheckStatus::Pass);
            tracing::info!(
                manifest = %path.display(),
                copied = copy.copied_files.len(),
                missing = copy.missing_files.len(),
                "snapshot written"
            );
        }
        Err(err) => {
            let msg = format!("{err:#}");
            checks.set(Check::SnapshotManifest, CheckStatus::Fail);
            failures.push(Failure::new(
                Check::SnapshotManifest,
                ARCHIVE_MANIFEST_WRITE_FAILED,
                msg.clone(),
                true,
            ));
            discard_partial_snapshot(&snapshot_dir);
            error.get_or_insert(msg);
            refresh_indexes(&archive_root, &cfg.version, &mut checks, &mut failures, &mut error);
            return Ok(finish(cfg, &archive_root, copy, Vec::new(), checks, failures, error));
        }
    }

    // The snapshot just written counts toward the limit even when it holds no files.
    let pruned = retention::prune_version(
        &layout::version_dir(&archive_root, &cfg.version),
        cfg.retention,
        Some(&cfg.snapshot_id),
    );

    refresh_indexes(&archive_root, &cfg.version, &mut checks, &mut failures, &mut error);
    Ok(finish(cfg, &archive_root, copy, pruned, checks, failures, error))
}

/// [`run_archive`] while holding the archive's advisory lock.
///
/// With `wait == false` a lock held by another writer fails the call
/// instead of blocking.
pub fn run_archive_locked(cfg: &ArchiveConfig, wait: bool) -> Result<ArchiveReport> {
    let archive_root = layout::archive_root(&cfg.artifacts_dir);
    let guard = if wait {
        lock::acquire(&archive_root)?
    } else {
        lock::try_acquire(&archive_root)?
    };
    tracing::debug!(lock = %guard.path().display(), "holding archive lock");
    run_archive(cfg)
}

/// Index stage. Runs on every path that may have changed the version
/// directory, including a discarded snapshot that replaced a reused id.
fn refresh_indexes(
    archive_root: &Path,
    version: &str,
    checks: &mut CheckStatuses,
    failures: &mut Vec<Failure>,
    error: &mut Option<String>,
) {
    let indexed = index::write_latest(archive_root, version)
        .and_then(|_| index::rebuild_catalog(archive_root));
    match indexed {
        Ok(_) => checks.set(Check::ArchiveIndexes, CheckStatus::Pass),
        Err(err) => {
            let msg = format!("{err:#}");
            checks.set(Check::ArchiveIndexes, CheckStatus::Fail);
            failures.push(Failure::new(
                Check::ArchiveIndexes,
                ARCHIVE_INDEX_WRITE_FAILED,
                msg.clone(),
                true,
            ));
            error.get_or_insert(msg);
        }
    }
}

fn discard_partial_snapshot(dir: &Path) {
    if let Err(err) = std::fs::remove_dir_all(dir) {
        if dir.exists() {
            tracing::warn!(dir = %dir.display(), %err, "failed to remove partial snapshot");
        }
    }
}

fn finish(
    cfg: &ArchiveConfig,
    archive_root: &Path,
    copy: CopyOutcome,
    pruned: Vec<PrunedSnapshot>,
    checks: CheckStatuses,
    failures: Vec<Failure>,
    error: Option<String>,
) -> ArchiveReport {
    let standardized = Standardized::from_checks(checks, failures);
    let ok = standardized.passed();
    ArchiveReport {
        schema: REPORT_SCHEMA.to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        root: display_path(&cfg.root),
        artifacts_dir: display_path(&cfg.artifacts_dir),
        archive_root: display_path(archive_root),
        version: cfg.version.clone(),
        tag: cfg.tag.clone(),
        snapshot_id: cfg.snapshot_id.clone(),
        snapshot_dir: display_path(&layout::snapshot_dir(
            archive_root,
            &cfg.version,
            &cfg.snapshot_id,
        )),
        copied_files: copy.copied_files,
        missing_files: copy.missing_files,
        pruned_snapshots: pruned,
        catalog_path: display_path(&layout::catalog_path(archive_root)),
        latest_path: display_path(&layout::latest_path(archive_root, &cfg.version)),
        options: cfg.retention.options(),
        ok,
        error,
        standardized,
    }
}
