use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Live SQLite database protected by the vault.
    pub db_path: PathBuf,
    /// Directory holding local snapshots.
    pub backup_dir: PathBuf,
    /// Snapshots older than this many days are pruned by the scheduled cycle.
    pub retention_days: u32,
    /// Local wall-clock hour the daily cycle fires at.
    pub schedule_hour: u32,
    pub log_level: String,
    /// Bearer token for the remote store. When absent, replication is a no-op.
    pub remote_token: Option<String>,
    /// Name of the dedicated remote folder snapshots are uploaded into.
    pub remote_folder: String,
    pub remote_api_base: String,
    pub remote_upload_base: String,
}

impl VaultConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".into()));

        Self {
            db_path: std::env::var("DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("office.db")),
            backup_dir: std::env::var("BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("backups")),
            retention_days: std::env::var("RETENTION_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            schedule_hour: std::env::var("BACKUP_HOUR")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|h| *h < 24)
                .unwrap_or(2),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            remote_token: std::env::var("REMOTE_TOKEN").ok().filter(|t| !t.is_empty()),
            remote_folder: std::env::var("REMOTE_FOLDER").unwrap_or_else(|_| "db-backups".into()),
            remote_api_base: std::env::var("REMOTE_API_BASE")
                .unwrap_or_else(|_| "https://www.googleapis.com/drive/v3".into()),
            remote_upload_base: std::env::var("REMOTE_UPLOAD_BASE")
                .unwrap_or_else(|_| "https://www.googleapis.com/upload/drive/v3".into()),
        }
    }
}
