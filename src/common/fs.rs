use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::ScoreError;

/// Error with `MissingArtifact` unless the file already exists.
pub(crate) fn require_file_exists(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(ScoreError::MissingArtifact { path: path.to_path_buf() }.into());
    }
    Ok(())
}

/// Write `bytes` to `path` atomically: a temporary file in the same
/// directory is filled, flushed and renamed over the destination.
/// Any failure surfaces as the fatal `ArtifactWrite` error and leaves
/// no file at `path`.
pub(crate) fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    let wrap = |source: std::io::Error| ScoreError::ArtifactWrite { path: path.to_path_buf(), source };

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(wrap)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(wrap)?;
    tmp.write_all(bytes).map_err(wrap)?;
    tmp.as_file().sync_all().map_err(wrap)?;
    tmp.persist(path).map_err(|e| wrap(e.error))?;
    Ok(())
}

/// Hex-encoded SHA-256 of a file's contents.
pub(crate) fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("open for hash {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 1 << 16];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
