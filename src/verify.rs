//! Structural verification of snapshot files.
//!
//! Three stages, each short-circuiting: the file exists and is non-empty, the
//! 16-byte header carries the SQLite magic, and a read-only connection can
//! answer a trivial query against the schema table. Every failure mode maps
//! to `false`; verification never returns an error to its caller.

use rusqlite::{Connection, OpenFlags};
use std::io::Read;
use std::path::Path;

const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Check whether `path` is a readable, structurally valid SQLite database.
///
/// Deterministic and side-effect-free: repeated calls on an unchanged file
/// return the same answer.
pub fn verify(path: &Path) -> bool {
    match check(path) {
        Ok(()) => true,
        Err(reason) => {
            tracing::debug!(file = %path.display(), %reason, "Verification failed");
            false
        }
    }
}

fn check(path: &Path) -> Result<(), String> {
    let meta = std::fs::metadata(path).map_err(|e| format!("stat: {e}"))?;
    if !meta.is_file() || meta.len() == 0 {
        return Err("missing or empty".into());
    }

    let mut header = [0u8; 16];
    let mut file = std::fs::File::open(path).map_err(|e| format!("open: {e}"))?;
    file.read_exact(&mut header)
        .map_err(|e| format!("read header: {e}"))?;
    if &header != SQLITE_MAGIC {
        return Err("bad magic".into());
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| format!("open read-only: {e}"))?;
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|e| format!("schema query: {e}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid_db(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("good.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1);")
            .unwrap();
        path
    }

    #[test]
    fn accepts_valid_database() {
        let tmp = TempDir::new().unwrap();
        assert!(verify(&valid_db(tmp.path())));
    }

    #[test]
    fn rejects_missing_file() {
        let tmp = TempDir::new().unwrap();
        assert!(!verify(&tmp.path().join("absent.db")));
    }

    #[test]
    fn rejects_empty_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.db");
        std::fs::write(&path, b"").unwrap();
        assert!(!verify(&path));
    }

    #[test]
    fn rejects_wrong_magic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("text.db");
        std::fs::write(&path, b"definitely not a database file at all").unwrap();
        assert!(!verify(&path));
    }

    #[test]
    fn rejects_magic_with_garbage_body() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("forged.db");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"SQLite format 3\0");
        bytes.extend_from_slice(&[0xAB; 4096]);
        std::fs::write(&path, &bytes).unwrap();
        assert!(!verify(&path));
    }

    #[test]
    fn repeated_calls_agree() {
        let tmp = TempDir::new().unwrap();
        let path = valid_db(tmp.path());
        let first = verify(&path);
        for _ in 0..5 {
            assert_eq!(verify(&path), first);
        }
    }
}
