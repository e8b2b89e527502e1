//! Snapshot creation with an ordered chain of strategies.
//!
//! The first strategy uses SQLite's online backup API, which yields a
//! self-contained copy and coexists with concurrent readers and the writer.
//! If that fails (source unopenable, backup API error), a raw byte copy of
//! the primary file plus any `-wal`/`-shm` companions is taken instead. The
//! raw copy takes no lock and is best-effort against active writers; that
//! risk is accepted and logged rather than guarded with a quiesce.

use crate::error::{Result, VaultError};
use crate::record::{self, BackupRecord};
use crate::verify;
use chrono::Local;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One way of materializing a snapshot of `source` at `dest`.
///
/// Strategies are tried in order; each must either produce a complete
/// snapshot file or fail without poisoning later attempts (the snapshotter
/// removes partial output between attempts).
pub trait SnapshotStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn snapshot(&self, source: &Path, dest: &Path) -> anyhow::Result<()>;
}

/// SQLite online backup API. Consistent and self-contained; holds no lock
/// that outlives the call.
pub struct SqliteBackupStrategy;

impl SnapshotStrategy for SqliteBackupStrategy {
    fn name(&self) -> &'static str {
        "sqlite-backup"
    }

    fn snapshot(&self, source: &Path, dest: &Path) -> anyhow::Result<()> {
        let src = Connection::open_with_flags(source, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let mut dst = Connection::open(dest)?;
        let backup = rusqlite::backup::Backup::new(&src, &mut dst)?;
        backup.run_to_completion(100, Duration::from_millis(10), None)?;
        Ok(())
    }
}

/// Byte-for-byte copy of the primary file and its companions, in that order.
/// Does not synchronize with writers.
pub struct RawCopyStrategy;

impl SnapshotStrategy for RawCopyStrategy {
    fn name(&self) -> &'static str {
        "raw-copy"
    }

    fn snapshot(&self, source: &Path, dest: &Path) -> anyhow::Result<()> {
        std::fs::copy(source, dest)?;
        let src_companions = record::companion_paths(source);
        let dest_companions = record::companion_paths(dest);
        for (from, to) in src_companions.iter().zip(dest_companions.iter()) {
            if from.exists() {
                std::fs::copy(from, to)?;
            }
        }
        Ok(())
    }
}

pub struct Snapshotter {
    source: PathBuf,
    backup_dir: PathBuf,
    strategies: Vec<Box<dyn SnapshotStrategy>>,
}

impl Snapshotter {
    pub fn new(source: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self::with_strategies(
            source,
            backup_dir,
            vec![Box::new(SqliteBackupStrategy), Box::new(RawCopyStrategy)],
        )
    }

    /// Custom strategy chain, used by tests for fault injection.
    pub fn with_strategies(
        source: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
        strategies: Vec<Box<dyn SnapshotStrategy>>,
    ) -> Self {
        Self {
            source: source.into(),
            backup_dir: backup_dir.into(),
            strategies,
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Create a new timestamp-named snapshot of the primary database.
    ///
    /// The record is returned even when post-snapshot verification fails;
    /// `verified` tells the caller which case it got.
    pub fn create_snapshot(&self) -> Result<BackupRecord> {
        if !self.source.exists() {
            return Err(VaultError::SourceMissing(self.source.clone()));
        }
        std::fs::create_dir_all(&self.backup_dir)?;

        // Bump forward a second at a time until the name is free; names stay
        // unique and non-decreasing even when snapshots land in one second.
        let mut at = Local::now();
        let dest = loop {
            let candidate = self.backup_dir.join(record::backup_filename(at));
            if !candidate.exists() {
                break candidate;
            }
            at += chrono::Duration::seconds(1);
        };
        let filename = record::backup_filename(at);

        let mut failures = Vec::new();
        for strategy in &self.strategies {
            match strategy.snapshot(&self.source, &dest) {
                Ok(()) => {
                    let size = std::fs::metadata(&dest)?.len();
                    let verified = verify::verify(&dest);
                    if verified {
                        tracing::info!(file = %filename, strategy = strategy.name(), size, "Snapshot created");
                    } else {
                        tracing::warn!(file = %filename, strategy = strategy.name(), "Snapshot created but failed verification");
                    }
                    return Ok(BackupRecord {
                        filename,
                        path: dest,
                        size,
                        created_at: at,
                        verified,
                        remote_id: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(strategy = strategy.name(), error = %e, "Snapshot strategy failed");
                    failures.push(format!("{}: {}", strategy.name(), e));
                    remove_partial(&dest);
                }
            }
        }

        Err(VaultError::SnapshotFailed(failures.join("; ")))
    }
}

/// Clear out whatever a failed strategy left behind.
fn remove_partial(dest: &Path) {
    let _ = std::fs::remove_file(dest);
    for companion in record::companion_paths(dest) {
        let _ = std::fs::remove_file(companion);
    }
}
