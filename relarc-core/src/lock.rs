//! Advisory single-writer lock on an archive root.
//!
//! The archive core assumes serialized writers. Callers that cannot
//! guarantee that externally hold this lock for the duration of a run.
//! Lock file path: <archive_root>/.lock (a file, so never listed as a version).

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::layout;

pub struct ArchiveLock {
    file: File,
    path: PathBuf,
}

impl ArchiveLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ArchiveLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn open_lock_file(archive_root: &Path) -> Result<(File, PathBuf)> {
    std::fs::create_dir_all(archive_root)
        .with_context(|| format!("create dir {}", archive_root.display()))?;
    let path = archive_root.join(layout::LOCK_FILE);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .with_context(|| format!("open lock file {}", path.display()))?;
    Ok((file, path))
}

/// Block until the exclusive lock is held.
pub fn acquire(archive_root: &Path) -> Result<ArchiveLock> {
    let (file, path) = open_lock_file(archive_root)?;
    file.lock_exclusive().with_context(|| format!("lock_exclusive {}", path.display()))?;
    tracing::debug!(path = %path.display(), "archive lock acquired");
    Ok(ArchiveLock { file, path })
}

/// Take the exclusive lock or fail immediately if another writer holds it.
pub fn try_acquire(archive_root: &Path) -> Result<ArchiveLock> {
    let (file, path) = open_lock_file(archive_root)?;
    file.try_lock_exclusive()
        .with_context(|| format!("archive is locked by another writer: {}", path.display()))?;
    Ok(ArchiveLock { file, path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_writer_is_refused_until_release() {
        let td = tempfile::tempdir().unwrap();
        let held = acquire(td.path()).unwrap();
        assert!(held.path().is_file());
        assert!(try_acquire(td.path()).is_err());
        drop(held);
        assert!(try_acquire(td.path()).is_ok());
    }

    #[test]
    fn lock_file_is_not_listed_as_a_version() {
        let td = tempfile::tempdir().unwrap();
        let _held = acquire(td.path()).unwrap();
        assert!(layout::list_subdirs_desc(td.path()).unwrap().is_empty());
    }
}
