//! dbvault — backup, verification, replication, retention and restore for
//! the SQLite database behind a live application.
//!
//! The snapshotter produces timestamp-named, self-contained copies of the
//! primary database while readers and the writer stay online, the verifier
//! checks any copy without false positives, the replicator ships copies to a
//! remote store on a best-effort basis, the retention manager prunes old
//! copies, and the restorer rolls the live database back to a snapshot
//! without losing the ability to undo the rollback. A daily scheduler drives
//! snapshot → upload → prune as one cycle.

pub mod config;
pub mod error;
pub mod record;
pub mod replicate;
pub mod restore;
pub mod retention;
pub mod scheduler;
pub mod snapshot;
pub mod vault;
pub mod verify;

pub use config::VaultConfig;
pub use error::{Result, VaultError};
pub use record::{BackupRecord, VaultStats};
pub use replicate::{DriveRemote, RemoteEntry, RemoteStore};
pub use scheduler::Scheduler;
pub use snapshot::{RawCopyStrategy, SnapshotStrategy, Snapshotter, SqliteBackupStrategy};
pub use vault::Vault;
