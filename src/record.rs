//! Local snapshot records and the on-disk naming scheme.
//!
//! Every snapshot is a standalone file named
//! `database-backup-<date>-<time>.db`; the timestamp is second-resolution
//! local time, so names sort chronologically and never collide. Snapshots
//! taken by the raw-copy fallback may carry `-wal`/`-shm` companion files
//! next to them, named by SQLite's own suffix convention.

use crate::error::{Result, VaultError};
use crate::verify;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const BACKUP_PREFIX: &str = "database-backup-";
pub const BACKUP_EXT: &str = ".db";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// Immutable description of one local snapshot.
///
/// `verified` is recomputed from the bytes on disk whenever a record is
/// built; it is never stored anywhere.
#[derive(Debug, Clone, Serialize)]
pub struct BackupRecord {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
    pub created_at: DateTime<Local>,
    pub verified: bool,
    pub remote_id: Option<String>,
}

/// Snapshot filename for the given creation time.
pub fn backup_filename(at: DateTime<Local>) -> String {
    format!("{}{}{}", BACKUP_PREFIX, at.format(TIMESTAMP_FORMAT), BACKUP_EXT)
}

/// Parse the creation time back out of a snapshot filename.
pub fn parse_timestamp(filename: &str) -> Option<DateTime<Local>> {
    let stamp = filename
        .strip_prefix(BACKUP_PREFIX)?
        .strip_suffix(BACKUP_EXT)?;
    let naive = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}

pub fn is_snapshot_name(filename: &str) -> bool {
    filename.starts_with(BACKUP_PREFIX)
        && filename.ends_with(BACKUP_EXT)
        && !filename.contains(['/', '\\'])
}

/// The `-wal` and `-shm` paths SQLite would use next to `path`.
pub fn companion_paths(path: &Path) -> [PathBuf; 2] {
    let base = path.as_os_str().to_string_lossy();
    [
        PathBuf::from(format!("{base}-wal")),
        PathBuf::from(format!("{base}-shm")),
    ]
}

/// Build a record for an existing snapshot file, verifying it on the spot.
pub fn record_for(path: &Path) -> Result<BackupRecord> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| VaultError::NotFound(path.display().to_string()))?;
    let meta = std::fs::metadata(path)?;
    let created_at = parse_timestamp(&filename)
        .or_else(|| meta.modified().ok().map(DateTime::from))
        .unwrap_or_else(Local::now);

    Ok(BackupRecord {
        verified: verify::verify(path),
        size: meta.len(),
        path: path.to_path_buf(),
        filename,
        created_at,
        remote_id: None,
    })
}

/// List all snapshots in `dir`, oldest first. A missing directory is an
/// empty list, not an error.
pub fn list_local(dir: &Path) -> Result<Vec<BackupRecord>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_snapshot_name(&name) {
            continue;
        }
        match record_for(&entry.path()) {
            Ok(rec) => records.push(rec),
            Err(e) => tracing::warn!(file = %name, error = %e, "Skipping unreadable snapshot"),
        }
    }

    records.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(records)
}

/// Delete one snapshot and its companions by filename.
pub fn delete_local(dir: &Path, filename: &str) -> Result<()> {
    if !is_snapshot_name(filename) {
        return Err(VaultError::NotFound(filename.to_string()));
    }
    let path = dir.join(filename);
    match std::fs::remove_file(&path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(VaultError::NotFound(filename.to_string()))
        }
        Err(e) => return Err(e.into()),
    }
    for companion in companion_paths(&path) {
        let _ = std::fs::remove_file(companion);
    }
    tracing::info!(file = %filename, "Deleted local snapshot");
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct VaultStats {
    pub count: usize,
    pub total_bytes: u64,
    pub oldest: Option<DateTime<Local>>,
    pub newest: Option<DateTime<Local>>,
}

pub fn stats(dir: &Path) -> Result<VaultStats> {
    let records = list_local(dir)?;
    Ok(VaultStats {
        count: records.len(),
        total_bytes: records.iter().map(|r| r.size).sum(),
        oldest: records.first().map(|r| r.created_at),
        newest: records.last().map(|r| r.created_at),
    })
}
