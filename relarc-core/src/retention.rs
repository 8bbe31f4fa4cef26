//! Age- and count-based eviction of a version's snapshots.
//!
//! Selection is a pure function over `(snapshot_id, modified)` pairs so the
//! rule can be exercised without touching the clock; removal is best-effort
//! and never fails the run.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::config::RetentionPolicy;
use crate::layout;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PruneReason {
    #[serde(rename = "max-age")]
    MaxAge,
    #[serde(rename = "max-count")]
    MaxCount,
    #[serde(rename = "max-age+max-count")]
    MaxAgeAndCount,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrunedSnapshot {
    pub snapshot_id: String,
    pub reason: PruneReason,
}

#[derive(Clone, Debug)]
pub struct SnapshotAge {
    pub snapshot_id: String,
    pub modified: SystemTime,
}

/// Decide which snapshots to evict.
///
/// `snapshots` must be sorted newest first (descending id). `protect` names a
/// snapshot that is kept regardless of rank or age; it still occupies its rank.
pub fn select_evictions(
    snapshots: &[SnapshotAge],
    policy: RetentionPolicy,
    now: SystemTime,
    protect: Option<&str>,
) -> Vec<PrunedSnapshot> {
    let max_age = Duration::from_secs(u64::from(policy.retention_days()) * SECS_PER_DAY);
    let mut out = Vec::new();
    for (rank, snap) in snapshots.iter().enumerate() {
        if protect == Some(snap.snapshot_id.as_str()) {
            continue;
        }
        // Clock skew (mtime in the future) counts as age zero.
        let age = now.duration_since(snap.modified).unwrap_or_default();
        let too_old = age > max_age;
        let overflow = rank >= policy.max_snapshots_per_version();
        let reason = match (too_old, overflow) {
            (true, true) => PruneReason::MaxAgeAndCount,
            (true, false) => PruneReason::MaxAge,
            (false, true) => PruneReason::MaxCount,
            (false, false) => continue,
        };
        out.push(PrunedSnapshot { snapshot_id: snap.snapshot_id.clone(), reason });
    }
    out
}

/// Snapshot directories of `version_dir` with their modification times, newest first.
pub fn list_snapshot_ages(version_dir: &Path) -> anyhow::Result<Vec<SnapshotAge>> {
    let mut out = Vec::new();
    for snapshot_id in layout::list_subdirs_desc(version_dir)? {
        let modified = fs::metadata(version_dir.join(&snapshot_id))
            .and_then(|m| m.modified())
            .unwrap_or_else(|_| SystemTime::now());
        out.push(SnapshotAge { snapshot_id, modified });
    }
    Ok(out)
}

pub fn prune_version(
    version_dir: &Path,
    policy: RetentionPolicy,
    protect: Option<&str>,
) -> Vec<PrunedSnapshot> {
    prune_version_at(version_dir, policy, protect, SystemTime::now())
}

/// Apply the retention rule to `version_dir` as of `now`.
///
/// Returns only the snapshots that were actually removed. Listing or removal
/// failures are logged and leave the directory in place.
pub fn prune_version_at(
    version_dir: &Path,
    policy: RetentionPolicy,
    protect: Option<&str>,
    now: SystemTime,
) -> Vec<PrunedSnapshot> {
    let snapshots = match list_snapshot_ages(version_dir) {
        Ok(s) => s,
        Err(err) => {
            tracing::warn!(
                dir = %version_dir.display(),
                err = %format!("{err:#}"),
                "cannot list snapshots; skipping prune"
            );
            return Vec::new();
        }
    };
    let mut pruned = Vec::new();
    for candidate in select_evictions(&snapshots, policy, now, protect) {
        let dir = version_dir.join(&candidate.snapshot_id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::info!(
                    snapshot_id = %candidate.snapshot_id,
                    reason = ?candidate.reason,
                    "pruned snapshot"
                );
                pruned.push(candidate);
            }
            Err(err) => {
                tracing::warn!(dir = %dir.display(), %err, "failed to prune snapshot; leaving it");
            }
        }
    }
    pruned
}
