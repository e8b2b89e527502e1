//! Facade tying the subsystem together for external callers.

use crate::config::VaultConfig;
use crate::error::Result;
use crate::record::{self, BackupRecord, VaultStats};
use crate::replicate::{DriveRemote, RemoteEntry, RemoteStore};
use crate::restore;
use crate::retention;
use crate::snapshot::Snapshotter;
use crate::verify;
use std::path::Path;
use std::sync::Arc;

/// Everything a collaborator (CRUD layer, CLI, scheduler) needs: snapshot
/// creation, listing, verification, restore, retention and the best-effort
/// remote operations. Local operations are blocking; wrap them in
/// `spawn_blocking` when calling from async context.
pub struct Vault {
    config: VaultConfig,
    snapshotter: Snapshotter,
    remote: Arc<dyn RemoteStore>,
}

impl Vault {
    pub fn new(config: VaultConfig) -> Self {
        let remote = Arc::new(DriveRemote::from_config(&config));
        Self::with_remote(config, remote)
    }

    /// Inject a remote store; tests substitute fakes here.
    pub fn with_remote(config: VaultConfig, remote: Arc<dyn RemoteStore>) -> Self {
        let snapshotter = Snapshotter::new(&config.db_path, &config.backup_dir);
        Self {
            config,
            snapshotter,
            remote,
        }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn create_snapshot(&self) -> Result<BackupRecord> {
        self.snapshotter.create_snapshot()
    }

    pub fn list_local(&self) -> Result<Vec<BackupRecord>> {
        record::list_local(&self.config.backup_dir)
    }

    pub fn verify(&self, path: &Path) -> bool {
        verify::verify(path)
    }

    pub fn delete_local(&self, filename: &str) -> Result<()> {
        record::delete_local(&self.config.backup_dir, filename)
    }

    /// Restore the live database from a named snapshot; returns the safety
    /// snapshot taken beforehand.
    pub fn restore(&self, filename: &str) -> Result<BackupRecord> {
        restore::restore(&self.config.db_path, &self.snapshotter, filename)
    }

    pub fn prune_older_than(&self, days: u32) -> Result<usize> {
        retention::prune_older_than(&self.config.backup_dir, days)
    }

    pub fn stats(&self) -> Result<VaultStats> {
        record::stats(&self.config.backup_dir)
    }

    pub async fn upload_remote(&self, path: &Path, name: &str) -> Option<String> {
        self.remote.upload(path, name).await
    }

    pub async fn list_remote(&self) -> Vec<RemoteEntry> {
        self.remote.list().await
    }

    pub async fn download_remote(&self, id: &str, dest: &Path) -> bool {
        self.remote.download(id, dest).await
    }

    pub async fn delete_remote(&self, id: &str) -> bool {
        self.remote.delete(id).await
    }
}
