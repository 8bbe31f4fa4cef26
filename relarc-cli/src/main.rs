use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use relarc_core::config::{ArchiveRequest, DEFAULT_ARTIFACTS_DIR};
use relarc_core::layout;
use relarc_core::manifest::LatestPointer;
use relarc_core::query::{run_query, Query};
use relarc_core::{run_archive, run_archive_locked, verify_snapshot};

mod render;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Markdown,
}

#[derive(Parser)]
#[command(name = "relarc", version, about = "Versioned archive of release report snapshots")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args, Clone)]
struct Location {
    /// Project root (holds package.json)
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Directory holding the release reports; defaults to <root>/artifacts
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,
}

impl Location {
    fn artifacts_dir(&self) -> PathBuf {
        self.artifacts_dir.clone().unwrap_or_else(|| self.root.join(DEFAULT_ARTIFACTS_DIR))
    }

    fn archive_root(&self) -> PathBuf {
        layout::archive_root(&self.artifacts_dir())
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Snapshot the release reports, apply retention and rebuild indexes
    Archive {
        #[command(flatten)]
        loc: Location,
        /// Version to archive under; "current" reads package.json
        #[arg(long)]
        version: Option<String>,
        /// Release tag recorded in the manifest (default v<version>)
        #[arg(long)]
        tag: Option<String>,
        /// Snapshot id (default: UTC now as YYYYMMDD_HHMMSS)
        #[arg(long)]
        snapshot_id: Option<String>,
        #[arg(long)]
        retention_days: Option<u32>,
        #[arg(long)]
        max_snapshots_per_version: Option<usize>,
        /// Candidate report file; repeat to replace the default list
        #[arg(long = "file")]
        files: Vec<String>,
        /// Hold an exclusive lock on the archive while writing
        #[arg(long, default_value_t = false)]
        lock: bool,
        /// With --lock, fail at once if another writer holds the lock
        #[arg(long, requires = "lock", default_value_t = false)]
        no_wait: bool,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Also write the JSON report to this path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Query versions, a version's latest snapshot, or one snapshot
    Query {
        #[command(flatten)]
        loc: Location,
        #[arg(long)]
        version: Option<String>,
        #[arg(long, requires = "version")]
        snapshot_id: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Re-hash a snapshot's files against its manifest
    Verify {
        #[command(flatten)]
        loc: Location,
        #[arg(long)]
        version: String,
        /// Snapshot to verify (default: the version's latest)
        #[arg(long)]
        snapshot_id: Option<String>,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "relarc=debug,relarc_core=debug"
    } else {
        "relarc=info,relarc_core=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let ok = match cli.cmd {
        Cmd::Archive {
            loc,
            version,
            tag,
            snapshot_id,
            retention_days,
            max_snapshots_per_version,
            files,
            lock,
            no_wait,
            format,
            out,
        } => {
            let req = ArchiveRequest {
                root: loc.root.clone(),
                artifacts_dir: Some(loc.artifacts_dir()),
                version,
                tag,
                snapshot_id,
                retention_days,
                max_snapshots_per_version,
                source_files: files,
            };
            let cfg = req.resolve()?;
            let report =
                if lock { run_archive_locked(&cfg, !no_wait)? } else { run_archive(&cfg)? };
            if let Some(path) = &out {
                layout::write_json(path, &report)?;
            }
            emit(format, &report, render::archive_markdown)?;
            report.ok
        }
        Cmd::Query { loc, version, snapshot_id, limit, format } => {
            let query = Query { version, snapshot_id, limit };
            let report = run_query(&loc.archive_root(), &query)?;
            emit(format, &report, render::query_markdown)?;
            report.ok
        }
        Cmd::Verify { loc, version, snapshot_id, format } => {
            let archive_root = loc.archive_root();
            let snapshot_id = match snapshot_id {
                Some(id) => id,
                None => latest_snapshot_id(&archive_root, &version)?,
            };
            let report = verify_snapshot(&archive_root, &version, &snapshot_id)?;
            emit(format, &report, render::verify_markdown)?;
            report.ok
        }
    };
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn latest_snapshot_id(archive_root: &Path, version: &str) -> Result<String> {
    let pointer: Option<LatestPointer> =
        layout::read_json_opt(&layout::latest_path(archive_root, version));
    match pointer {
        Some(p) if !p.latest_snapshot_id.is_empty() => {
            tracing::debug!(version, snapshot_id = %p.latest_snapshot_id, "verify latest");
            Ok(p.latest_snapshot_id)
        }
        _ => bail!("version '{version}' has no snapshots"),
    }
}

fn emit<T: Serialize>(format: Format, value: &T, markdown: fn(&T) -> String) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(value)?),
        Format::Markdown => print!("{}", markdown(value)),
    }
    Ok(())
}
