//! Roll the live database back to a prior snapshot.
//!
//! A restore is only ever attempted against a snapshot that passes
//! verification, and a safety snapshot of the current live state is taken
//! first so the rollback itself can be undone. If the overwrite fails
//! partway the live file may be inconsistent; the remedy is to re-run
//! restore with the safety snapshot. Reconnecting any live database handle
//! afterwards is the owning process's job.

use crate::error::{Result, VaultError};
use crate::record::{self, BackupRecord};
use crate::snapshot::Snapshotter;
use crate::verify;
use std::path::Path;

/// Overwrite `primary` with the named snapshot from the snapshotter's
/// backup directory. Returns the record of the safety snapshot taken before
/// any byte of the live file was touched.
pub fn restore(primary: &Path, snapshotter: &Snapshotter, filename: &str) -> Result<BackupRecord> {
    if !record::is_snapshot_name(filename) {
        return Err(VaultError::RestoreRejected(format!(
            "{filename} is not a snapshot filename"
        )));
    }
    let backup_path = snapshotter.backup_dir().join(filename);
    if !verify::verify(&backup_path) {
        return Err(VaultError::RestoreRejected(format!(
            "{filename} failed verification"
        )));
    }

    // The safety snapshot must exist before the live file changes; any
    // failure here aborts with the primary untouched.
    let safety = snapshotter.create_snapshot()?;
    tracing::info!(safety = %safety.filename, "Safety snapshot taken before restore");

    std::fs::copy(&backup_path, primary)?;

    // Drop stale journal state so the engine reopens cleanly.
    for companion in record::companion_paths(primary) {
        match std::fs::remove_file(&companion) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(file = %filename, "Database restored from snapshot");
    Ok(safety)
}
