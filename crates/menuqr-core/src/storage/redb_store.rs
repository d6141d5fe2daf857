//! # Redb Store
//!
//! [`Store`] backed by an embedded redb database file.
//!
//! One `&[u8] -> &[u8]` table per entity. A [`Batch`] maps onto a single
//! write transaction, so it commits atomically.

use super::{Batch, Store, TABLES, WriteOp};
use crate::error::CoreResult;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};
use tracing::debug;

type RawTable = TableDefinition<'static, &'static [u8], &'static [u8]>;

const fn table(name: &'static str) -> RawTable {
    TableDefinition::new(name)
}

/// Disk-backed store.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").field("path", &self.path).finish()
    }
}

impl RedbStore {
    /// Open (or create) the database at `path` and make sure every table
    /// exists.
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path)?;

        let txn = db.begin_write()?;
        for name in TABLES {
            txn.open_table(table(name))?;
        }
        txn.commit()?;

        debug!(path = %path.display(), "redb store opened");
        Ok(Self { db, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Store for RedbStore {
    fn get_raw(&self, name: &'static str, key: &[u8]) -> CoreResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read()?;
        let rows = txn.open_table(table(name))?;
        Ok(rows.get(key)?.map(|value| value.value().to_vec()))
    }

    fn scan_raw(&self, name: &'static str) -> CoreResult<Vec<Vec<u8>>> {
        let txn = self.db.begin_read()?;
        let rows = txn.open_table(table(name))?;

        let mut values = Vec::new();
        for entry in rows.iter()? {
            let (_, value) = entry?;
            values.push(value.value().to_vec());
        }
        Ok(values)
    }

    fn scan_prefix_raw(
        &self,
        name: &'static str,
        prefix: &[u8],
    ) -> CoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let txn = self.db.begin_read()?;
        let rows = txn.open_table(table(name))?;

        let mut entries = Vec::new();
        for entry in rows.range(prefix..)? {
            let (key, value) = entry?;
            if !key.value().starts_with(prefix) {
                break;
            }
            entries.push((key.value().to_vec(), value.value().to_vec()));
        }
        Ok(entries)
    }

    fn apply(&self, batch: Batch) -> CoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let txn = self.db.begin_write()?;
        for op in batch.into_ops() {
            match op {
                WriteOp::Put { table: name, key, value } => {
                    let mut rows = txn.open_table(table(name))?;
                    rows.insert(key.as_slice(), value.as_slice())?;
                }
                WriteOp::Delete { table: name, key } => {
                    let mut rows = txn.open_table(table(name))?;
                    rows.remove(key.as_slice())?;
                }
            }
        }
        txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{IndexExt, Record, StoreExt};
    use crate::types::{QrCode, QrCodeScan, ScanId, ScanMetadata, User};
    use chrono::Utc;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, RedbStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("menuqr.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn open_creates_empty_tables() {
        let (_dir, store) = open_temp();
        let users: Vec<User> = store.all().unwrap();
        assert!(users.is_empty());
    }

    #[test]
    fn batch_commits_together() {
        let (_dir, store) = open_temp();
        let now = Utc::now();
        let mut qr = QrCode::new("abcde", now);
        qr.increment_scans(now);
        let scan = QrCodeScan {
            id: ScanId::new(),
            qr_code_id: qr.id,
            scanned_at: now,
            fingerprint: None,
            metadata: ScanMetadata::default(),
        };

        let mut batch = Batch::new();
        batch.put(&qr).unwrap().put(&scan).unwrap();
        batch.index_qr_code(&qr).index_scan(&scan);
        store.apply(batch).unwrap();

        let loaded: QrCode = store.get(&qr.key()).unwrap().unwrap();
        assert_eq!(loaded.total_scans, 1);
        let scans: Vec<QrCodeScan> = store.all().unwrap();
        assert_eq!(scans, vec![scan.clone()]);

        assert_eq!(store.qr_code_id_by_code("abcde").unwrap(), Some(qr.id));
        let entries = store.scan_entries(qr.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].scan_id, scan.id);
    }

    #[test]
    fn scan_index_is_time_ordered_per_code() {
        let (_dir, store) = open_temp();
        let base = Utc::now();
        let qr = QrCode::new("abcde", base);
        let other = QrCode::new("fghij", base);

        let mut batch = Batch::new();
        for (qr_code_id, minutes) in [(qr.id, 30), (other.id, 10), (qr.id, -90), (qr.id, 5)] {
            batch.index_scan(&QrCodeScan {
                id: ScanId::new(),
                qr_code_id,
                scanned_at: base + chrono::Duration::minutes(minutes),
                fingerprint: None,
                metadata: ScanMetadata::default(),
            });
        }
        store.apply(batch).unwrap();

        let times: Vec<_> = store
            .scan_entries(qr.id)
            .unwrap()
            .iter()
            .map(|e| e.scanned_at)
            .collect();
        assert_eq!(times.len(), 3);
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(store.scan_entries(other.id).unwrap().len(), 1);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menuqr.redb");
        let user = User::from_login("0700000000", Utc::now());

        {
            let store = RedbStore::open(&path).unwrap();
            store.put(&user).unwrap();
        }

        let store = RedbStore::open(&path).unwrap();
        let loaded: Option<User> = store.get(&user.key()).unwrap();
        assert_eq!(loaded, Some(user));
    }
}
