use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::digest::file_digest;
use crate::layout::{self, display_path};
use crate::manifest::SnapshotManifest;
use crate::path_safety::{validate_component, validate_source_name};

pub const VERIFY_SCHEMA: &str = "release-archive-verify/v1";

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Mismatch,
    Missing,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileCheck {
    pub file: String,
    pub status: FileStatus,
    pub expected_sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_sha256: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub schema: String,
    pub generated_at: String,
    pub archive_root: String,
    pub version: String,
    pub snapshot_id: String,
    pub files_ok: usize,
    pub files_bad: usize,
    pub files_missing: usize,
    pub files: Vec<FileCheck>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Re-hash a snapshot's copied files against its manifest. Read-only.
pub fn verify_snapshot(
    archive_root: &Path,
    version: &str,
    snapshot_id: &str,
) -> Result<VerifyReport> {
    validate_component("version", version)?;
    validate_component("snapshot id", snapshot_id)?;
    let mut report = VerifyReport {
        schema: VERIFY_SCHEMA.to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        archive_root: display_path(archive_root),
        version: version.to_string(),
        snapshot_id: snapshot_id.to_string(),
        files_ok: 0,
        files_bad: 0,
        files_missing: 0,
        files: Vec::new(),
        ok: false,
        error: None,
    };
    let Some(mf) = layout::read_json_opt::<SnapshotManifest>(&layout::manifest_path(
        archive_root,
        version,
        snapshot_id,
    )) else {
        report.error = Some(format!("manifest not found for {version}/{snapshot_id}"));
        return Ok(report);
    };

    let snap = layout::snapshot_dir(archive_root, version, snapshot_id);
    for cf in &mf.copied_files {
        // A tampered manifest must not steer reads outside the snapshot.
        let path = match validate_source_name(&cf.file) {
            Ok(rel) => snap.join(rel),
            Err(_) => {
                report.files_bad += 1;
                report.files.push(FileCheck {
                    file: cf.file.clone(),
                    status: FileStatus::Mismatch,
                    expected_sha256: cf.sha256.clone(),
                    actual_sha256: None,
                });
                continue;
            }
        };
        let (status, actual) = match file_digest(&path) {
            Ok((bytes, sha)) if bytes == cf.bytes && sha == cf.sha256 => {
                (FileStatus::Ok, Some(sha))
            }
            Ok((_, sha)) => (FileStatus::Mismatch, Some(sha)),
            Err(_) => (FileStatus::Missing, None),
        };
        match status {
            FileStatus::Ok => report.files_ok += 1,
            FileStatus::Mismatch => report.files_bad += 1,
            FileStatus::Missing => report.files_missing += 1,
        }
        report.files.push(FileCheck {
            file: cf.file.clone(),
            status,
            expected_sha256: cf.sha256.clone(),
            actual_sha256: actual,
        });
    }
    report.ok = report.files_bad == 0 && report.files_missing == 0;
    if !report.ok {
        report.error = Some(format!(
            "{} file(s) differ and {} file(s) are missing in {version}/{snapshot_id}",
            report.files_bad, report.files_missing
        ));
    }
    tracing::info!(
        version,
        snapshot_id,
        ok = report.files_ok,
        bad = report.files_bad,
        missing = report.files_missing,
        "snapshot verified"
    );
    Ok(report)
}
