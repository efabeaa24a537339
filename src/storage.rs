use std::io::Write;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};
use tempfile::NamedTempFile;

use crate::errors::PersistenceError;

/// Outcome of reading one of the JSON state files.
#[derive(Debug)]
pub enum Loaded<T> {
    Found(T),
    Missing,
    Malformed(serde_json::Error),
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Loaded<T>, PersistenceError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Loaded::Missing),
        Err(e) => return Err(PersistenceError::io(path, e)),
    };

    Ok(match serde_json::from_slice(&bytes) {
        Ok(value) => Loaded::Found(value),
        Err(e) => Loaded::Malformed(e),
    })
}

/// Replace `path` with the pretty JSON rendering of `value`.
///
/// The document is written to a temporary file in the same directory and
/// renamed over the target, so a failed write leaves the previous file intact.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| PersistenceError::io(dir, e))?;

    let body = serde_json::to_vec_pretty(value)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PersistenceError::io(dir, e))?;
    tmp.write_all(&body)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| PersistenceError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| PersistenceError::io(path, e.error))?;

    Ok(())
}
