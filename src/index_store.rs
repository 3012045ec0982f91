//! Snapshot persistence.
//!
//! Snapshots are written as JSON to a temporary file next to the
//! destination, flushed to disk, and then renamed over the destination.
//! Readers therefore see either the previous complete snapshot or the new
//! complete snapshot, never a partial write. A failed save leaves the
//! previous file untouched and removes the temporary file.

use std::io::Write;
use std::path::Path;

use msfind_core::error::{IndexError, Result};
use msfind_core::IndexSnapshot;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Save `snapshot` to `path`, returning the SHA-256 of the bytes written.
pub fn save(snapshot: &IndexSnapshot, path: &Path) -> Result<String> {
    let json = snapshot
        .to_json()
        .map_err(|e| IndexError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| IndexError::Io(e.error))?;

    let digest = digest(json.as_bytes());
    info!(
        path = %path.display(),
        chunks = snapshot.len(),
        bytes = json.len(),
        sha256 = %digest,
        "saved index snapshot"
    );
    Ok(digest)
}

/// Load and validate the snapshot at `path`.
///
/// I/O failures surface as [`IndexError::Io`]; unparsable or inconsistent
/// content as [`IndexError::CorruptIndex`].
pub fn load(path: &Path) -> Result<IndexSnapshot> {
    let json = std::fs::read_to_string(path)?;
    let snapshot = IndexSnapshot::from_json(&json)?;
    debug!(path = %path.display(), chunks = snapshot.len(), "loaded index snapshot");
    Ok(snapshot)
}

/// SHA-256 of the snapshot file currently at `path`.
pub fn file_digest(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(digest(&bytes))
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
