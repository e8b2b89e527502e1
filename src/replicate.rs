//! Best-effort replication of snapshots to a remote object store.
//!
//! Every operation degrades to its failure value (`None`/`false`/empty list)
//! instead of returning an error: remote availability must never affect the
//! correctness of local backups. With no token configured the operations
//! short-circuit without touching the network at all.

use crate::config::VaultConfig;
use crate::error::VaultError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;

/// One snapshot as the remote store sees it. Remote entries carry no required
/// correspondence to local records; replication is fire-and-forget.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub created_time: Option<DateTime<Utc>>,
    pub modified_time: Option<DateTime<Utc>>,
}

/// Seam for the remote store. The production implementation talks HTTP;
/// tests substitute in-memory fakes.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upload a local file under `name`; the remote id on success.
    async fn upload(&self, path: &Path, name: &str) -> Option<String>;

    /// All entries in the dedicated remote folder.
    async fn list(&self) -> Vec<RemoteEntry>;

    /// Download the entry `id` to `dest`.
    async fn download(&self, id: &str, dest: &Path) -> bool;

    /// Delete the entry `id`.
    async fn delete(&self, id: &str) -> bool;
}

/// Drive-style remote store client.
///
/// Keeps one dedicated folder for snapshots, located or created lazily on
/// first use and cached for the process lifetime.
pub struct DriveRemote {
    client: reqwest::Client,
    api_base: String,
    upload_base: String,
    token: Option<String>,
    folder_name: String,
    folder_id: Mutex<Option<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    // The API reports sizes as decimal strings.
    size: Option<String>,
    created_time: Option<DateTime<Utc>>,
    modified_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

impl DriveRemote {
    pub fn from_config(config: &VaultConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.remote_api_base.clone(),
            upload_base: config.remote_upload_base.clone(),
            token: config.remote_token.clone(),
            folder_name: config.remote_folder.clone(),
            folder_id: Mutex::new(None),
        }
    }

    fn token(&self) -> Result<&str, VaultError> {
        self.token
            .as_deref()
            .ok_or_else(|| VaultError::RemoteUnavailable("no credentials configured".into()))
    }

    /// Locate or create the snapshot folder; the id is cached after the
    /// first successful lookup.
    async fn ensure_folder(&self) -> Result<String, VaultError> {
        let mut cached = self.folder_id.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let token = self.token()?;
        let query = format!(
            "name = '{}' and mimeType = 'application/vnd.google-apps.folder' and trashed = false",
            self.folder_name.replace('\'', "\\'")
        );
        let found: DriveFileList = self
            .client
            .get(format!("{}/files", self.api_base))
            .bearer_auth(token)
            .query(&[("q", query.as_str()), ("fields", "files(id, name)")])
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?
            .json()
            .await
            .map_err(remote_err)?;

        let id = match found.files.into_iter().next() {
            Some(folder) => folder.id,
            None => {
                let created: DriveFile = self
                    .client
                    .post(format!("{}/files", self.api_base))
                    .bearer_auth(token)
                    .json(&serde_json::json!({
                        "name": self.folder_name,
                        "mimeType": "application/vnd.google-apps.folder",
                    }))
                    .send()
                    .await
                    .map_err(remote_err)?
                    .error_for_status()
                    .map_err(remote_err)?
                    .json()
                    .await
                    .map_err(remote_err)?;
                tracing::info!(folder = %self.folder_name, id = %created.id, "Created remote snapshot folder");
                created.id
            }
        };

        *cached = Some(id.clone());
        Ok(id)
    }

    async fn upload_impl(&self, path: &Path, name: &str) -> Result<String, VaultError> {
        let folder_id = self.ensure_folder().await?;
        let token = self.token()?;
        let bytes = tokio::fs::read(path).await?;

        let metadata = serde_json::json!({ "name": name, "parents": [folder_id] }).to_string();
        let form = reqwest::multipart::Form::new()
            .part(
                "metadata",
                reqwest::multipart::Part::text(metadata)
                    .mime_str("application/json")
                    .map_err(remote_err)?,
            )
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes)
                    .file_name(name.to_string())
                    .mime_str("application/octet-stream")
                    .map_err(remote_err)?,
            );

        let uploaded: DriveFile = self
            .client
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", "id, name")])
            .multipart(form)
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?
            .json()
            .await
            .map_err(remote_err)?;

        Ok(uploaded.id)
    }

    async fn list_impl(&self) -> Result<Vec<RemoteEntry>, VaultError> {
        let folder_id = self.ensure_folder().await?;
        let token = self.token()?;
        let query = format!("'{folder_id}' in parents and trashed = false");
        let found: DriveFileList = self
            .client
            .get(format!("{}/files", self.api_base))
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id, name, size, createdTime, modifiedTime)"),
                ("orderBy", "name"),
            ])
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?
            .json()
            .await
            .map_err(remote_err)?;

        Ok(found
            .files
            .into_iter()
            .map(|f| RemoteEntry {
                size: f.size.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0),
                id: f.id,
                name: f.name,
                created_time: f.created_time,
                modified_time: f.modified_time,
            })
            .collect())
    }

    async fn download_impl(&self, id: &str, dest: &Path) -> Result<(), VaultError> {
        let token = self.token()?;
        let bytes = self
            .client
            .get(format!("{}/files/{}", self.api_base, id))
            .bearer_auth(token)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?
            .bytes()
            .await
            .map_err(remote_err)?;

        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }

    async fn delete_impl(&self, id: &str) -> Result<(), VaultError> {
        let token = self.token()?;
        self.client
            .delete(format!("{}/files/{}", self.api_base, id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?;
        Ok(())
    }
}

fn remote_err(e: impl std::fmt::Display) -> VaultError {
    VaultError::RemoteUnavailable(e.to_string())
}

#[async_trait]
impl RemoteStore for DriveRemote {
    async fn upload(&self, path: &Path, name: &str) -> Option<String> {
        if self.token.is_none() {
            tracing::debug!("Remote store not configured, skipping upload");
            return None;
        }
        match self.upload_impl(path, name).await {
            Ok(id) => {
                tracing::info!(%name, remote_id = %id, "Uploaded snapshot to remote store");
                Some(id)
            }
            Err(e) => {
                tracing::warn!(%name, error = %e, "Remote upload failed");
                None
            }
        }
    }

    async fn list(&self) -> Vec<RemoteEntry> {
        if self.token.is_none() {
            return Vec::new();
        }
        match self.list_impl().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "Remote listing failed");
                Vec::new()
            }
        }
    }

    async fn download(&self, id: &str, dest: &Path) -> bool {
        if self.token.is_none() {
            return false;
        }
        match self.download_impl(id, dest).await {
            Ok(()) => {
                tracing::info!(%id, dest = %dest.display(), "Downloaded remote snapshot");
                true
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "Remote download failed");
                false
            }
        }
    }

    async fn delete(&self, id: &str) -> bool {
        if self.token.is_none() {
            return false;
        }
        match self.delete_impl(id).await {
            Ok(()) => {
                tracing::info!(%id, "Deleted remote snapshot");
                true
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "Remote delete failed");
                false
            }
        }
    }
}
