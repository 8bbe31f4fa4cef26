use relarc_core::config::{ArchiveConfig, RetentionPolicy};
use relarc_core::digest::file_digest;
use relarc_core::layout;
use relarc_core::manifest::{Catalog, LatestPointer, SnapshotManifest};
use relarc_core::report::{CheckStatus, ARCHIVE_SOURCE_FILES_MISSING};
use relarc_core::run_archive;
use std::fs;
use std::path::{Path, PathBuf};

fn config(
    root: &Path,
    version: &str,
    snapshot_id: &str,
    policy: RetentionPolicy,
) -> ArchiveConfig {
    ArchiveConfig {
        root: root.to_path_buf(),
        artifacts_dir: root.join("artifacts"),
        version: version.to_string(),
        tag: format!("v{version}"),
        snapshot_id: snapshot_id.to_string(),
        retention: policy,
        source_files: ["release-ready.json", "release-health.json", "release-notes.md"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

fn seed_artifacts(root: &Path) -> PathBuf {
    let artifacts = root.join("artifacts");
    fs::create_dir_all(&artifacts).unwrap();
    fs::write(artifacts.join("release-ready.json"), br#"{"ready":true}"#).unwrap();
    fs::write(artifacts.join("release-health.json"), br#"{"npm":"ok","github":"ok"}"#).unwrap();
    artifacts
}

fn read<T: serde::de::DeserializeOwned>(path: &Path) -> T {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

#[test]
fn first_snapshot_writes_manifest_latest_and_catalog() {
    let td = tempfile::tempdir().unwrap();
    seed_artifacts(td.path());
    let cfg = config(td.path(), "9.9.9", "20260225_100000", RetentionPolicy::default());

    let report = run_archive(&cfg).unwrap();
    assert!(report.ok, "unexpected failure: {:?}", report.error);
    assert_eq!(report.copied_files.len(), 2);
    assert_eq!(report.missing_files, vec!["release-notes.md".to_string()]);
    assert!(report.pruned_snapshots.is_empty());
    assert_eq!(report.standardized.result_code, "RELEASE_ARCHIVE_OK");

    let archive = layout::archive_root(&cfg.artifacts_dir);
    let manifest_path = layout::manifest_path(&archive, "9.9.9", "20260225_100000");
    assert!(manifest_path.is_file());
    assert!(Path::new(&report.catalog_path).is_file());
    assert!(Path::new(&report.latest_path).is_file());

    let catalog: Catalog = read(&layout::catalog_path(&archive));
    assert_eq!(catalog.versions.len(), 1);
    assert_eq!(catalog.versions[0].version, "9.9.9");
    assert_eq!(catalog.versions[0].snapshot_count, 1);
    assert_eq!(catalog.versions[0].latest_snapshot_id, "20260225_100000");

    let latest: LatestPointer = read(&layout::latest_path(&archive, "9.9.9"));
    assert_eq!(latest.latest_snapshot_id, "20260225_100000");

    let text = fs::read_to_string(&manifest_path).unwrap();
    assert!(text.ends_with('\n'));
}

#[test]
fn manifest_hashes_match_bytes_on_disk() {
    let td = tempfile::tempdir().unwrap();
    let artifacts = seed_artifacts(td.path());
    fs::create_dir_all(artifacts.join("reports")).unwrap();
    fs::write(artifacts.join("reports/summary.md"), b"# Release summary\n").unwrap();
    let mut cfg = config(td.path(), "1.4.0", "20260301_090000", RetentionPolicy::default());
    cfg.source_files.push("reports/summary.md".to_string());

    let report = run_archive(&cfg).unwrap();
    assert!(report.ok);
    let archive = layout::archive_root(&cfg.artifacts_dir);
    let manifest: SnapshotManifest =
        read(&layout::manifest_path(&archive, "1.4.0", "20260301_090000"));
    assert_eq!(manifest.copied_files, report.copied_files);
    assert_eq!(manifest.options, cfg.retention.options());
    assert_eq!(manifest.tag, "v1.4.0");

    let snap = layout::snapshot_dir(&archive, "1.4.0", "20260301_090000");
    for cf in &manifest.copied_files {
        let (bytes, sha) = file_digest(&snap.join(&cf.file)).unwrap();
        assert_eq!(bytes, cf.bytes, "{}", cf.file);
        assert_eq!(sha, cf.sha256, "{}", cf.file);
    }
    assert!(manifest.copied_files.iter().any(|c| c.file == "reports/summary.md"));
}

#[test]
fn count_limit_prunes_older_snapshots_and_keeps_the_new_one() {
    let td = tempfile::tempdir().unwrap();
    seed_artifacts(td.path());
    let policy = RetentionPolicy::new(3650, 5);
    for id in ["20260224_100000", "20260224_110000"] {
        assert!(run_archive(&config(td.path(), "9.9.9", id, policy)).unwrap().ok);
    }

    let cfg = config(td.path(), "9.9.9", "20260225_120000", RetentionPolicy::new(3650, 1));
    let report = run_archive(&cfg).unwrap();
    assert!(report.ok);
    let mut pruned: Vec<_> =
        report.pruned_snapshots.iter().map(|p| p.snapshot_id.clone()).collect();
    pruned.sort();
    assert_eq!(pruned, vec!["20260224_100000", "20260224_110000"]);

    let archive = layout::archive_root(&cfg.artifacts_dir);
    let left = layout::list_subdirs_desc(&layout::version_dir(&archive, "9.9.9")).unwrap();
    assert_eq!(left, vec!["20260225_120000"]);
    let catalog: Catalog = read(&layout::catalog_path(&archive));
    assert_eq!(catalog.versions[0].snapshots, vec!["20260225_120000"]);
}

#[test]
fn archiving_nothing_fails_but_still_counts_toward_retention() {
    let td = tempfile::tempdir().unwrap();
    seed_artifacts(td.path());
    let policy = RetentionPolicy::new(30, 1);
    assert!(run_archive(&config(td.path(), "2.0.0", "20260101_000000", policy)).unwrap().ok);

    // The archive lives under artifacts/, so only the report files go.
    fs::remove_file(td.path().join("artifacts/release-ready.json")).unwrap();
    fs::remove_file(td.path().join("artifacts/release-health.json")).unwrap();
    let cfg = config(td.path(), "2.0.0", "20260102_000000", policy);
    let report = run_archive(&cfg).unwrap();

    assert!(!report.ok);
    assert!(report.copied_files.is_empty());
    assert_eq!(report.missing_files.len(), 3);
    assert!(report
        .standardized
        .failure_codes
        .contains(&ARCHIVE_SOURCE_FILES_MISSING.to_string()));
    assert_eq!(report.standardized.check_statuses.source_artifacts, CheckStatus::Fail);
    assert_eq!(report.standardized.check_statuses.snapshot_manifest, CheckStatus::Pass);
    assert_eq!(report.standardized.check_statuses.archive_indexes, CheckStatus::Pass);

    // The empty snapshot is still a snapshot: count_before (1) + 1 - max (1).
    let pruned: Vec<_> = report.pruned_snapshots.iter().map(|p| p.snapshot_id.as_str()).collect();
    assert_eq!(pruned, vec!["20260101_000000"]);
    let archive = layout::archive_root(&cfg.artifacts_dir);
    assert!(layout::manifest_path(&archive, "2.0.0", "20260102_000000").is_file());
    let left = layout::list_subdirs_desc(&layout::version_dir(&archive, "2.0.0")).unwrap();
    assert_eq!(left, vec!["20260102_000000"]);
}

#[test]
fn empty_runs_keep_a_full_version_at_its_limit() {
    let td = tempfile::tempdir().unwrap();
    let artifacts = seed_artifacts(td.path());
    let roomy = RetentionPolicy::new(3650, 10);
    for id in ["20260101_000000", "20260102_000000", "20260103_000000"] {
        assert!(run_archive(&config(td.path(), "5.0.0", id, roomy)).unwrap().ok);
    }
    fs::remove_file(artifacts.join("release-ready.json")).unwrap();
    fs::remove_file(artifacts.join("release-health.json")).unwrap();

    let cfg = config(td.path(), "5.0.0", "20260104_000000", RetentionPolicy::new(3650, 1));
    let report = run_archive(&cfg).unwrap();
    assert!(!report.ok);
    assert_eq!(report.pruned_snapshots.len(), 3);

    let archive = layout::archive_root(&artifacts);
    let left = layout::list_subdirs_desc(&layout::version_dir(&archive, "5.0.0")).unwrap();
    assert_eq!(left, vec!["20260104_000000"]);
    let latest: LatestPointer = read(&layout::latest_path(&archive, "5.0.0"));
    assert_eq!(latest.latest_snapshot_id, "20260104_000000");
}

#[test]
fn catalog_reconciles_manual_deletions_across_versions() {
    let td = tempfile::tempdir().unwrap();
    seed_artifacts(td.path());
    let policy = RetentionPolicy::default();
    run_archive(&config(td.path(), "1.0.0", "20260101_000000", policy)).unwrap();
    run_archive(&config(td.path(), "1.0.0", "20260102_000000", policy)).unwrap();
    run_archive(&config(td.path(), "1.1.0", "20260103_000000", policy)).unwrap();

    let archive = layout::archive_root(&td.path().join("artifacts"));
    fs::remove_dir_all(layout::snapshot_dir(&archive, "1.0.0", "20260102_000000")).unwrap();
    fs::create_dir_all(layout::version_dir(&archive, "0.9.0")).unwrap();

    run_archive(&config(td.path(), "1.1.0", "20260104_000000", policy)).unwrap();
    let catalog: Catalog = read(&layout::catalog_path(&archive));
    let scan = relarc_core::index::scan_archive_root(&archive).unwrap();
    assert_eq!(catalog.versions, scan.versions);

    let names: Vec<_> = catalog.versions.iter().map(|v| v.version.as_str()).collect();
    assert_eq!(names, vec!["1.1.0", "1.0.0", "0.9.0"]);
    let v100 = &catalog.versions[1];
    assert_eq!(v100.snapshot_count, 1);
    assert_eq!(v100.latest_snapshot_id, "20260101_000000");
    assert_eq!(catalog.versions[0].snapshot_count, 2);
    assert_eq!(catalog.versions[2].snapshot_count, 0);
}

#[test]
fn reused_snapshot_id_overwrites_in_place() {
    let td = tempfile::tempdir().unwrap();
    let artifacts = seed_artifacts(td.path());
    let cfg = config(td.path(), "3.0.0", "20260110_000000", RetentionPolicy::default());
    run_archive(&cfg).unwrap();

    fs::remove_file(artifacts.join("release-health.json")).unwrap();
    let report = run_archive(&cfg).unwrap();
    assert!(report.ok);
    assert_eq!(report.copied_files.len(), 1);

    let snap = layout::snapshot_dir(&layout::archive_root(&artifacts), "3.0.0", "20260110_000000");
    assert!(!snap.join("release-health.json").exists());
    let catalog: Catalog = read(&layout::catalog_path(&layout::archive_root(&artifacts)));
    assert_eq!(catalog.versions[0].snapshot_count, 1);
}
