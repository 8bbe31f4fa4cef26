//! Result record of an archive run and its standardized outcome block.

use serde::{Deserialize, Serialize};

use crate::manifest::{CopiedFile, RetentionOptions};
use crate::retention::PrunedSnapshot;

pub const REPORT_SCHEMA: &str = "release-archive-report/v1";

pub const RESULT_CODE_OK: &str = "RELEASE_ARCHIVE_OK";
pub const RESULT_CODE_FAIL: &str = "RELEASE_ARCHIVE_FAIL";

pub const ARCHIVE_SOURCE_FILES_MISSING: &str = "ARCHIVE_SOURCE_FILES_MISSING";
pub const ARCHIVE_SOURCE_COPY_FAILED: &str = "ARCHIVE_SOURCE_COPY_FAILED";
pub const ARCHIVE_MANIFEST_WRITE_FAILED: &str = "ARCHIVE_MANIFEST_WRITE_FAILED";
pub const ARCHIVE_INDEX_WRITE_FAILED: &str = "ARCHIVE_INDEX_WRITE_FAILED";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skip,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Pass,
    Fail,
}

/// Stages of a run, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Check {
    SourceArtifacts,
    SnapshotManifest,
    ArchiveIndexes,
}

impl Check {
    pub fn name(self) -> &'static str {
        match self {
            Check::SourceArtifacts => "sourceArtifacts",
            Check::SnapshotManifest => "snapshotManifest",
            Check::ArchiveIndexes => "archiveIndexes",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckStatuses {
    pub source_artifacts: CheckStatus,
    pub snapshot_manifest: CheckStatus,
    pub archive_indexes: CheckStatus,
}

impl Default for CheckStatuses {
    fn default() -> Self {
        Self {
            source_artifacts: CheckStatus::Skip,
            snapshot_manifest: CheckStatus::Skip,
            archive_indexes: CheckStatus::Skip,
        }
    }
}

impl CheckStatuses {
    pub fn set(&mut self, check: Check, status: CheckStatus) {
        match check {
            Check::SourceArtifacts => self.source_artifacts = status,
            Check::SnapshotManifest => self.snapshot_manifest = status,
            Check::ArchiveIndexes => self.archive_indexes = status,
        }
    }

    fn all(&self) -> [CheckStatus; 3] {
        [self.source_artifacts, self.snapshot_manifest, self.archive_indexes]
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub check: String,
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl Failure {
    pub fn new(check: Check, code: &str, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            check: check.name().to_string(),
            code: code.to_string(),
            message: message.into(),
            retryable,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_checks: usize,
    pub pass_count: usize,
    pub fail_count: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Standardized {
    pub status: OverallStatus,
    pub result_code: String,
    pub summary: Summary,
    pub check_statuses: CheckStatuses,
    pub failure_codes: Vec<String>,
    pub failures: Vec<Failure>,
}

impl Standardized {
    /// Passes only when every check passed; a skipped check is not a pass.
    pub fn from_checks(checks: CheckStatuses, failures: Vec<Failure>) -> Self {
        let all = checks.all();
        let pass_count = all.iter().filter(|s| **s == CheckStatus::Pass).count();
        let fail_count = all.iter().filter(|s| **s == CheckStatus::Fail).count();
        let passed = pass_count == all.len() && failures.is_empty();
        Self {
            status: if passed { OverallStatus::Pass } else { OverallStatus::Fail },
            result_code: if passed { RESULT_CODE_OK } else { RESULT_CODE_FAIL }.to_string(),
            summary: Summary { total_checks: all.len(), pass_count, fail_count },
            check_statuses: checks,
            failure_codes: failures.iter().map(|f| f.code.clone()).collect(),
            failures,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == OverallStatus::Pass
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveReport {
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
    pub pruned_snapshots: Vec<PrunedSnapshot>,
    pub catalog_path: String,
    pub latest_path: String,
    pub options: RetentionOptions,
    pub ok: bool,
    pub error: Option<String>,
    pub standardized: Standardized,
}
