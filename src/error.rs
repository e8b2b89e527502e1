//! Error taxonomy for the vault.
//!
//! Snapshot, verification and restore failures are surfaced to the caller.
//! Remote-store failures are absorbed by the replicator and only ever show up
//! in logs; `RemoteUnavailable` exists so the replicator internals can carry a
//! reason up to the point where it is logged and dropped.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("primary database not found: {0}")]
    SourceMissing(PathBuf),

    #[error("all snapshot strategies failed: {0}")]
    SnapshotFailed(String),

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("restore rejected: {0}")]
    RestoreRejected(String),

    #[error("backup not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VaultError>;
