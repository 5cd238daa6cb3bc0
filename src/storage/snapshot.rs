// src/storage/snapshot.rs
use std::fs;
use std::io::{ErrorKind, Write};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use log::info;
use crate::error::StoreError;
use crate::models::server::ServerRecord;

/// Reads a JSON snapshot. A missing file is an empty registry.
pub fn load(path: &Path) -> Result<Vec<ServerRecord>, StoreError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No snapshot at {}, starting empty", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };
    let records: Vec<ServerRecord> = serde_json::from_slice(&data)?;
    info!("Loaded {} servers from {}", records.len(), path.display());
    Ok(records)
}

/// Sibling of `path` with `.tmp` appended, never equal to `path` itself.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Writes the snapshot beside `path` first and renames it over the old file.
pub fn save(path: &Path, records: &[ServerRecord]) -> Result<(), StoreError> {
    let data = serde_json::to_vec_pretty(records)?;
    let tmp = temp_path(path);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&data)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    info!("Saved {} servers to {}", records.len(), path.display());
    Ok(())
}
