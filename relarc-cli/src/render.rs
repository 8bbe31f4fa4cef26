//! Markdown summaries for `--format markdown`.

use relarc_core::query::{QueryReport, QueryResult};
use relarc_core::report::CheckStatus;
use relarc_core::{ArchiveReport, VerifyReport};
use serde::Serialize;
use std::fmt::Write;

fn status(ok: bool) -> &'static str {
    if ok {
        "PASS"
    } else {
        "FAIL"
    }
}

/// Serialized name of a unit enum, e.g. `max-age` or `version-latest`.
fn label<T: Serialize>(value: T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn check(s: CheckStatus) -> &'static str {
    match s {
        CheckStatus::Pass => "pass",
        CheckStatus::Fail => "fail",
        CheckStatus::Skip => "skip",
    }
}

pub fn archive_markdown(r: &ArchiveReport) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "# Release archive: {} ({})\n", r.version, status(r.ok));
    let _ = writeln!(s, "- Tag: `{}`", r.tag);
    let _ = writeln!(s, "- Snapshot: `{}`", r.snapshot_id);
    let _ = writeln!(s, "- Snapshot dir: `{}`", r.snapshot_dir);
    let _ = writeln!(s, "- Result code: `{}`", r.standardized.result_code);
    let _ = writeln!(
        s,
        "- Retention: {} days, {} snapshots per version",
        r.options.retention_days, r.options.max_snapshots_per_version
    );
    if let Some(err) = &r.error {
        let _ = writeln!(s, "- Error: {err}");
    }

    let c = &r.standardized.check_statuses;
    let _ = writeln!(s, "\n| Check | Status |\n|---|---|");
    let _ = writeln!(s, "| sourceArtifacts | {} |", check(c.source_artifacts));
    let _ = writeln!(s, "| snapshotManifest | {} |", check(c.snapshot_manifest));
    let _ = writeln!(s, "| archiveIndexes | {} |", check(c.archive_indexes));

    if !r.copied_files.is_empty() {
        let _ = writeln!(s, "\n## Copied files\n\n| File | Bytes | SHA-256 |\n|---|---:|---|");
        for f in &r.copied_files {
            let _ = writeln!(s, "| {} | {} | `{}` |", f.file, f.bytes, f.sha256);
        }
    }
    if !r.missing_files.is_empty() {
        let _ = writeln!(s, "\n## Missing files\n");
        for f in &r.missing_files {
            let _ = writeln!(s, "- {f}");
        }
    }
    if !r.pruned_snapshots.is_empty() {
        let _ = writeln!(s, "\n## Pruned snapshots\n");
        for p in &r.pruned_snapshots {
            let _ = writeln!(s, "- `{}` ({})", p.snapshot_id, label(p.reason));
        }
    }
    s
}

pub fn query_markdown(r: &QueryReport) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "# Release archive query: {} ({})\n", label(r.mode), status(r.ok));
    if let Some(err) = &r.error {
        let _ = writeln!(s, "Error: {err}");
        return s;
    }
    match &r.result {
        Some(QueryResult::Versions { versions }) => {
            if versions.is_empty() {
                let _ = writeln!(s, "No archived versions.");
            } else {
                let _ = writeln!(s, "| Version | Latest snapshot | Snapshots |\n|---|---|---:|");
                for v in versions {
                    let _ = writeln!(
                        s,
                        "| {} | `{}` | {} |",
                        v.version, v.latest_snapshot_id, v.snapshot_count
                    );
                }
            }
        }
        Some(QueryResult::VersionLatest(v)) => {
            let _ = writeln!(s, "- Version: {}", v.version);
            let _ = writeln!(s, "- Latest snapshot: `{}`", v.latest_snapshot_id);
            let _ = writeln!(s, "- Directory: `{}`\n", v.latest_snapshot_dir);
            for id in &v.snapshots {
                let _ = writeln!(s, "- `{id}`");
            }
        }
        Some(QueryResult::Snapshot(v)) => {
            let _ = writeln!(s, "- Version: {} (tag `{}`)", v.version, v.tag);
            let _ = writeln!(s, "- Snapshot: `{}`", v.snapshot_id);
            let _ = writeln!(s, "- Directory: `{}`", v.snapshot_dir);
            let _ = writeln!(s, "- Copied files: {}", v.copied_files);
            let _ = writeln!(s, "- Missing files: {}", v.missing_files);
        }
        None => {}
    }
    s
}

pub fn verify_markdown(r: &VerifyReport) -> String {
    let mut s = String::new();
    let _ = writeln!(
        s,
        "# Snapshot verify: {}/{} ({})\n",
        r.version,
        r.snapshot_id,
        status(r.ok)
    );
    let _ = writeln!(
        s,
        "- ok: {}, mismatched: {}, missing: {}",
        r.files_ok, r.files_bad, r.files_missing
    );
    if let Some(err) = &r.error {
        let _ = writeln!(s, "- Error: {err}");
    }
    if !r.files.is_empty() {
        let _ = writeln!(s, "\n| File | Status |\n|---|---|");
        for f in &r.files {
            let _ = writeln!(s, "| {} | {} |", f.file, label(f.status));
        }
    }
    s
}
