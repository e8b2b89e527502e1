//! End-to-end tests for the vault facade and the scheduled cycle.

use async_trait::async_trait;
use dbvault::{scheduler, RemoteEntry, RemoteStore, Scheduler, Vault, VaultConfig};
use rusqlite::Connection;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio::sync::Mutex;

fn test_config(dir: &Path) -> VaultConfig {
    VaultConfig {
        db_path: dir.join("office.db"),
        backup_dir: dir.join("backups"),
        retention_days: 30,
        schedule_hour: 2,
        log_level: "info".into(),
        remote_token: None,
        remote_folder: "db-backups".into(),
        remote_api_base: "http://127.0.0.1:1/drive".into(),
        remote_upload_base: "http://127.0.0.1:1/upload".into(),
    }
}

fn seed_db(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE bills (id INTEGER PRIMARY KEY, total REAL);
         CREATE TABLE parties (id INTEGER PRIMARY KEY, name TEXT);
         INSERT INTO bills (total) VALUES (10.0), (20.0), (30.0);
         INSERT INTO parties (name) VALUES ('acme'), ('globex');",
    )
    .unwrap();
}

fn age_file(path: &Path, days: u64) {
    let mtime = SystemTime::now() - Duration::from_secs(days * 86_400);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
}

/// In-memory remote store.
struct FakeRemote {
    files: Mutex<HashMap<String, (String, Vec<u8>)>>,
    next_id: AtomicU64,
}

impl FakeRemote {
    fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn upload(&self, path: &Path, name: &str) -> Option<String> {
        let bytes = std::fs::read(path).ok()?;
        let id = format!("remote-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.files
            .lock()
            .await
            .insert(id.clone(), (name.to_string(), bytes));
        Some(id)
    }

    async fn list(&self) -> Vec<RemoteEntry> {
        self.files
            .lock()
            .await
            .iter()
            .map(|(id, (name, bytes))| RemoteEntry {
                id: id.clone(),
                name: name.clone(),
                size: bytes.len() as u64,
                created_time: None,
                modified_time: None,
            })
            .collect()
    }

    async fn download(&self, id: &str, dest: &Path) -> bool {
        match self.files.lock().await.get(id) {
            Some((_, bytes)) => std::fs::write(dest, bytes).is_ok(),
            None => false,
        }
    }

    async fn delete(&self, id: &str) -> bool {
        self.files.lock().await.remove(id).is_some()
    }
}

/// Remote store where every call fails.
struct DeadRemote;

#[async_trait]
impl RemoteStore for DeadRemote {
    async fn upload(&self, _path: &Path, _name: &str) -> Option<String> {
        None
    }

    async fn list(&self) -> Vec<RemoteEntry> {
        Vec::new()
    }

    async fn download(&self, _id: &str, _dest: &Path) -> bool {
        false
    }

    async fn delete(&self, _id: &str) -> bool {
        false
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn cycle_survives_a_dead_remote() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    seed_db(&config.db_path);
    let vault = Arc::new(Vault::with_remote(config, Arc::new(DeadRemote)));

    let rec = scheduler::run_cycle(&vault).await.expect("snapshot");
    assert!(rec.verified);
    assert!(rec.remote_id.is_none());

    // Local state is fully intact despite the failed upload.
    let records = vault.list_local().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(vault.prune_older_than(30).unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn cycle_records_remote_id_when_upload_succeeds() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    seed_db(&config.db_path);
    let remote = Arc::new(FakeRemote::new());
    let vault = Arc::new(Vault::with_remote(config, remote));

    let rec = scheduler::run_cycle(&vault).await.expect("snapshot");
    assert!(rec.remote_id.is_some());

    let listed = vault.list_remote().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, rec.filename);
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_round_trip_through_the_facade() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    seed_db(&config.db_path);
    let vault = Vault::with_remote(config, Arc::new(FakeRemote::new()));

    let rec = vault.create_snapshot().unwrap();
    let id = vault
        .upload_remote(&rec.path, &rec.filename)
        .await
        .expect("upload");

    let dest = tmp.path().join("fetched.db");
    assert!(vault.download_remote(&id, &dest).await);
    assert_eq!(std::fs::read(&dest).unwrap(), std::fs::read(&rec.path).unwrap());
    assert!(vault.verify(&dest));

    assert!(vault.delete_remote(&id).await);
    assert!(vault.list_remote().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn prune_keeps_the_recent_snapshot_verifiable() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    seed_db(&config.db_path);
    let vault = Vault::with_remote(config, Arc::new(DeadRemote));

    let b1 = vault.create_snapshot().unwrap();
    let b2 = vault.create_snapshot().unwrap();
    age_file(&b1.path, 5);
    age_file(&b2.path, 35);

    assert_eq!(vault.prune_older_than(30).unwrap(), 1);
    let remaining = vault.list_local().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].filename, b1.filename);
    assert!(vault.verify(&b1.path));

    assert_eq!(vault.prune_older_than(30).unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn restore_through_the_facade_round_trips_rows() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let db_path = config.db_path.clone();
    seed_db(&db_path);
    let vault = Vault::with_remote(config, Arc::new(DeadRemote));

    let snapshot = vault.create_snapshot().unwrap();
    {
        let conn = Connection::open(&db_path).unwrap();
        conn.execute("DELETE FROM bills", []).unwrap();
    }

    let safety = vault.restore(&snapshot.filename).unwrap();
    assert_ne!(safety.filename, snapshot.filename);

    let conn = Connection::open(&db_path).unwrap();
    let bills: i64 = conn
        .query_row("SELECT count(*) FROM bills", [], |r| r.get(0))
        .unwrap();
    let parties: i64 = conn
        .query_row("SELECT count(*) FROM parties", [], |r| r.get(0))
        .unwrap();
    assert_eq!(bills, 3);
    assert_eq!(parties, 2);

    // The safety snapshot preserves the pre-restore state (no bills).
    let safety_conn = Connection::open(&safety.path).unwrap();
    let safety_bills: i64 = safety_conn
        .query_row("SELECT count(*) FROM bills", [], |r| r.get(0))
        .unwrap();
    assert_eq!(safety_bills, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn scheduler_runs_a_cycle_on_start_and_stops_cleanly() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    seed_db(&config.db_path);
    let vault = Arc::new(Vault::with_remote(config, Arc::new(DeadRemote)));

    let scheduler = Scheduler::start(vault.clone());

    // The immediate cycle should leave one snapshot behind.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        if !vault.list_local().unwrap().is_empty() {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "no snapshot appeared");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    scheduler.stop();
    scheduler.stop(); // idempotent
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_local_through_the_facade() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    seed_db(&config.db_path);
    let vault = Vault::with_remote(config, Arc::new(DeadRemote));

    let rec = vault.create_snapshot().unwrap();
    assert_eq!(vault.stats().unwrap().count, 1);

    vault.delete_local(&rec.filename).unwrap();
    assert_eq!(vault.stats().unwrap().count, 0);
    assert!(!rec.path.exists());
}
