//! Transactional key-value storage over SQLite.
//!
//! Each bucket is a table of `(key BLOB PRIMARY KEY, value BLOB)`. Buckets are
//! created on first write, so readers must handle a missing bucket. All access
//! goes through [`WalletStore::update`] (read-write) or [`WalletStore::view`]
//! (read-only); each call runs inside one SQLite transaction that commits only
//! if the closure succeeds.

use std::path::Path;

use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::error::WalletError;

// ─── WalletStore ────────────────────────────────────────────────────────────

pub struct WalletStore {
    conn: Connection,
}

impl WalletStore {
    /// Open (or create) a store at `path`.
    pub fn open(path: &Path) -> Result<Self, WalletError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        debug!("opened wallet store at {}", path.display());
        Ok(WalletStore { conn })
    }

    /// Store that lives only as long as the returned value.
    pub fn open_in_memory() -> Result<Self, WalletError> {
        let conn = Connection::open_in_memory()?;
        Ok(WalletStore { conn })
    }

    /// Run `f` in a read-write transaction. Changes commit only if `f` returns `Ok`.
    pub fn update<T, F>(&self, f: F) -> Result<T, WalletError>
    where
        F: FnOnce(&StoreTx<'_>) -> Result<T, WalletError>,
    {
        let tx = StoreTx { tx: self.conn.unchecked_transaction()?, writable: true };
        let out = f(&tx)?;
        tx.tx.commit()?;
        Ok(out)
    }

    /// Run `f` in a read-only transaction.
    pub fn view<T, F>(&self, f: F) -> Result<T, WalletError>
    where
        F: FnOnce(&StoreTx<'_>) -> Result<T, WalletError>,
    {
        let tx = StoreTx { tx: self.conn.unchecked_transaction()?, writable: false };
        f(&tx)
    }
}

// ─── Transactions ───────────────────────────────────────────────────────────

/// A storage transaction handed to `update` and `view` closures.
pub struct StoreTx<'conn> {
    tx: Transaction<'conn>,
    writable: bool,
}

fn storage(op: &'static str) -> impl Fn(rusqlite::Error) -> WalletError {
    move |source| WalletError::Storage { op, source }
}

fn table_name(op: &'static str, bucket: &str) -> Result<String, WalletError> {
    let valid = !bucket.is_empty()
        && bucket.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if !valid {
        return Err(WalletError::Invalid { op, reason: format!("invalid bucket name {:?}", bucket) });
    }
    Ok(format!("bucket_{}", bucket))
}

impl StoreTx<'_> {
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    fn ensure_writable(&self, op: &'static str) -> Result<(), WalletError> {
        if self.writable {
            Ok(())
        } else {
            Err(WalletError::ReadOnly { op })
        }
    }

    pub fn bucket_exists(&self, bucket: &str) -> Result<bool, WalletError> {
        const OP: &str = "walletdb.bucket_exists";
        let table = table_name(OP, bucket)?;
        let found: Option<i64> = self
            .tx
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |r| r.get(0),
            )
            .optional()
            .map_err(storage(OP))?;
        Ok(found.is_some())
    }

    pub fn create_bucket_if_not_exists(&self, bucket: &str) -> Result<(), WalletError> {
        const OP: &str = "walletdb.create_bucket";
        self.ensure_writable(OP)?;
        let table = table_name(OP, bucket)?;
        self.tx
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (key BLOB PRIMARY KEY, value BLOB NOT NULL);"
            ))
            .map_err(storage(OP))
    }

    /// Value stored under `key`, or `None` if the bucket or key is absent.
    pub fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, WalletError> {
        const OP: &str = "walletdb.get";
        if !self.bucket_exists(bucket)? {
            return Ok(None);
        }
        let table = table_name(OP, bucket)?;
        self.tx
            .query_row(&format!("SELECT value FROM {table} WHERE key = ?1"), params![key], |r| r.get(0))
            .optional()
            .map_err(storage(OP))
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<(), WalletError> {
        const OP: &str = "walletdb.put";
        self.ensure_writable(OP)?;
        if !self.bucket_exists(bucket)? {
            return Err(WalletError::Invalid { op: OP, reason: format!("bucket {} does not exist", bucket) });
        }
        let table = table_name(OP, bucket)?;
        self.tx
            .execute(&format!("INSERT OR REPLACE INTO {table} (key, value) VALUES (?1, ?2)"), params![key, value])
            .map_err(storage(OP))?;
        Ok(())
    }

    /// Remove `key`; absent keys and buckets are not an error.
    pub fn delete(&self, bucket: &str, key: &[u8]) -> Result<(), WalletError> {
        const OP: &str = "walletdb.delete";
        self.ensure_writable(OP)?;
        if !self.bucket_exists(bucket)? {
            return Ok(());
        }
        let table = table_name(OP, bucket)?;
        self.tx
            .execute(&format!("DELETE FROM {table} WHERE key = ?1"), params![key])
            .map_err(storage(OP))?;
        Ok(())
    }

    /// All `(key, value)` pairs in `bucket`, ordered by key.
    pub fn entries(&self, bucket: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>, WalletError> {
        const OP: &str = "walletdb.entries";
        if !self.bucket_exists(bucket)? {
            return Ok(Vec::new());
        }
        let table = table_name(OP, bucket)?;
        let mut stmt = self
            .tx
            .prepare(&format!("SELECT key, value FROM {table} ORDER BY key"))
            .map_err(storage(OP))?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .map_err(storage(OP))?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(storage(OP))?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_bucket_reads_empty() {
        let store = WalletStore::open_in_memory().unwrap();
        store
            .view(|tx| {
                assert!(!tx.bucket_exists("things")?);
                assert_eq!(tx.get("things", b"k")?, None);
                assert!(tx.entries("things")?.is_empty());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_put_get_delete() {
        let store = WalletStore::open_in_memory().unwrap();
        store
            .update(|tx| {
                tx.create_bucket_if_not_exists("things")?;
                tx.put("things", b"a", b"1")?;
                tx.put("things", b"b", b"2")?;
                tx.put("things", b"a", b"3")
            })
            .unwrap();
        let got = store.view(|tx| tx.get("things", b"a")).unwrap();
        assert_eq!(got, Some(b"3".to_vec()));

        store.update(|tx| tx.delete("things", b"a")).unwrap();
        store.update(|tx| tx.delete("things", b"a")).unwrap();
        let entries = store.view(|tx| tx.entries("things")).unwrap();
        assert_eq!(entries, vec![(b"b".to_vec(), b"2".to_vec())]);
    }

    #[test]
    fn test_failed_update_rolls_back() {
        let store = WalletStore::open_in_memory().unwrap();
        let result: Result<(), WalletError> = store.update(|tx| {
            tx.create_bucket_if_not_exists("things")?;
            tx.put("things", b"a", b"1")?;
            Err(WalletError::Invalid { op: "test", reason: "abort".into() })
        });
        assert!(result.is_err());
        assert!(!store.view(|tx| tx.bucket_exists("things")).unwrap());
    }

    #[test]
    fn test_view_is_read_only() {
        let store = WalletStore::open_in_memory().unwrap();
        let err = store.view(|tx| tx.create_bucket_if_not_exists("things")).unwrap_err();
        assert!(matches!(err, WalletError::ReadOnly { .. }));
    }

    #[test]
    fn test_bucket_names_validated() {
        let store = WalletStore::open_in_memory().unwrap();
        let err = store.update(|tx| tx.create_bucket_if_not_exists("x; DROP TABLE y")).unwrap_err();
        assert!(matches!(err, WalletError::Invalid { .. }));
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.db");
        {
            let store = WalletStore::open(&path).unwrap();
            store
                .update(|tx| {
                    tx.create_bucket_if_not_exists("things")?;
                    tx.put("things", b"k", b"v")
                })
                .unwrap();
        }
        let store = WalletStore::open(&path).unwrap();
        assert_eq!(store.view(|tx| tx.get("things", b"k")).unwrap(), Some(b"v".to_vec()));
    }
}
