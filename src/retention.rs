//! Age-based pruning of local snapshots.

use crate::error::Result;
use crate::record;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Delete local snapshots older than `days` days, by file modification time.
/// Companion files go with their snapshot. Remote entries are never touched.
/// Returns how many snapshots were deleted; idempotent.
pub fn prune_older_than(dir: &Path, days: u32) -> Result<usize> {
    let cutoff = SystemTime::now() - Duration::from_secs(u64::from(days) * 86_400);
    prune_before(dir, cutoff)
}

/// Deterministic core of [`prune_older_than`]: delete snapshots whose
/// modification time precedes `cutoff`.
pub fn prune_before(dir: &Path, cutoff: SystemTime) -> Result<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut deleted = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !record::is_snapshot_name(&name) {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "Cannot read snapshot mtime, skipping");
                continue;
            }
        };
        if modified >= cutoff {
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                for companion in record::companion_paths(&entry.path()) {
                    let _ = std::fs::remove_file(companion);
                }
                tracing::info!(file = %name, "Pruned expired snapshot");
                deleted += 1;
            }
            Err(e) => tracing::warn!(file = %name, error = %e, "Failed to prune snapshot"),
        }
    }

    Ok(deleted)
}
