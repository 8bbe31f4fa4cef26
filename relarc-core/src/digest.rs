use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Size and hex SHA-256 of a file's current contents.
pub fn file_digest(path: &Path) -> Result<(u64, String)> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    let mut total = 0u64;
    loop {
        let n = f.read(&mut buf).with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    Ok((total, hex::encode(hasher.finalize())))
}

/// Copy `src` to `dst`, hashing exactly the bytes handed to the writer.
/// Returns the byte count and hex SHA-256 of the written stream.
pub fn copy_with_digest(src: &Path, dst: &Path) -> Result<(u64, String)> {
    let mut input = File::open(src).with_context(|| format!("open {}", src.display()))?;
    let mut out = File::create(dst).with_context(|| format!("create {}", dst.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    let mut total = 0u64;
    loop {
        let n = input.read(&mut buf).with_context(|| format!("read {}", src.display()))?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).with_context(|| format!("write {}", dst.display()))?;
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    out.sync_all().with_context(|| format!("sync {}", dst.display()))?;
    Ok((total, hex::encode(hasher.finalize())))
}
