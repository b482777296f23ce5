use crate::error::VgateError;
use crate::vschema::VSchemaSnapshot;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Writes the snapshot as pretty JSON through a temp file in the target
/// directory. The file being replaced is kept alongside as `<name>.prev`.
pub fn save_vschema(snapshot: &VSchemaSnapshot, path: &Path) -> Result<(), VgateError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    if path.exists() {
        let prev = prev_path(path);
        fs::copy(path, &prev)?;
        fsync_file(&prev)?;
    }

    let bytes =
        serde_json::to_vec_pretty(snapshot).map_err(|e| VgateError::Encode(e.to_string()))?;
    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(&bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| VgateError::Io(e.error))?;
    fsync_dir(&dir)?;
    Ok(())
}

/// Reads a JSON vschema, falling back to the `.prev` copy when the primary
/// file is missing or unreadable.
pub fn load_vschema(path: &Path) -> Result<VSchemaSnapshot, VgateError> {
    match read_vschema(path) {
        Ok(snapshot) => Ok(snapshot),
        Err(primary_err) => {
            let prev = prev_path(path);
            if !prev.exists() {
                return Err(primary_err);
            }
            tracing::warn!(
                path = %path.display(),
                error = %primary_err,
                "vschema file unreadable, loading previous copy"
            );
            read_vschema(&prev)
        }
    }
}

fn read_vschema(path: &Path) -> Result<VSchemaSnapshot, VgateError> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| VgateError::Decode(e.to_string()))
}

/// MessagePack payload carried to watchers outside the process.
pub fn encode_snapshot(snapshot: &VSchemaSnapshot) -> Result<Vec<u8>, VgateError> {
    rmp_serde::to_vec_named(snapshot).map_err(|e| VgateError::Encode(e.to_string()))
}

pub fn decode_snapshot(bytes: &[u8]) -> Result<VSchemaSnapshot, VgateError> {
    rmp_serde::from_slice(bytes).map_err(|e| VgateError::Decode(e.to_string()))
}

fn prev_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".prev");
    PathBuf::from(name)
}

fn fsync_file(path: &Path) -> Result<(), VgateError> {
    let file = fs::OpenOptions::new().read(true).open(path)?;
    file.sync_all()?;
    Ok(())
}

fn fsync_dir(path: &Path) -> Result<(), VgateError> {
    let dir = fs::File::open(path)?;
    dir.sync_all()?;
    Ok(())
}
