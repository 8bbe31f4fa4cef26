use anyhow::{bail, Result};
use std::path::{Component, Path, PathBuf};

/// Ensure `name` is usable as a single directory name inside the archive:
/// non-empty, no separators, not `.` or `..`.
///
/// Versions and snapshot ids are both joined onto archive paths, so both go
/// through here. `what` only labels the error.
pub fn validate_component(what: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("{what} must not be empty");
    }
    if name.contains('/') || name.contains('\\') {
        bail!("{what} must not contain path separators: {name:?}");
    }
    let mut comps = Path::new(name).components();
    match (comps.next(), comps.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => bail!("{what} is not a plain directory name: {name:?}"),
    }
}

/// Ensure a source file name is relative and free of parent traversal.
/// Returns the name as a relative path.
pub fn validate_source_name(name: &str) -> Result<PathBuf> {
    let rel = Path::new(name);
    if name.is_empty() {
        bail!("source file name must not be empty");
    }
    if rel.is_absolute() {
        bail!("absolute paths are not allowed: {:?}", rel);
    }
    for comp in rel.components() {
        match comp {
            Component::ParentDir => bail!("parent traversal not allowed: {:?}", rel),
            Component::Prefix(_) | Component::RootDir => {
                bail!("absolute paths are not allowed: {:?}", rel)
            }
            _ => {}
        }
    }
    Ok(rel.to_path_buf())
}

/// Resolve `rel` under `root`, requiring that the canonical target stays
/// under the canonical root (symlinks are followed but may not escape).
///
/// Returns `Ok(None)` when the target does not exist or is not a regular file.
pub fn resolve_contained_file(root: &Path, rel: &Path) -> Result<Option<PathBuf>> {
    let candidate = root.join(rel);
    let Ok(meta) = std::fs::metadata(&candidate) else {
        return Ok(None);
    };
    if !meta.is_file() {
        return Ok(None);
    }
    let root_can = std::fs::canonicalize(root)?;
    let cand_can = std::fs::canonicalize(&candidate)?;
    if !cand_can.starts_with(&root_can) {
        bail!("path escapes root: {:?}", rel);
    }
    Ok(Some(candidate))
}
