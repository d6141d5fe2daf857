//! # Storage Module
//!
//! Key/value persistence for the domain records.
//!
//! Each entity lives in its own table, keyed by the raw bytes of its id and
//! encoded with postcard. Two backends implement [`Store`]:
//! - [`MemoryStore`]: BTreeMap tables, for tests and throwaway runs
//! - [`RedbStore`]: embedded redb file (ACID, crash safe, MVCC readers)
//!
//! Writes go through a [`Batch`] so that a scan row and its counter update
//! land together or not at all. Lookups by QR code string and per-code scan
//! ranges go through the raw index tables of [`index`], written in the same
//! batch as the records they point at.

pub mod index;
mod memory;
mod redb_store;

pub use index::{IndexExt, ScanEntry};
pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::error::CoreResult;
use crate::types::{Menu, Notification, QrCode, QrCodeScan, Restaurant, User};
use serde::Serialize;
use serde::de::DeserializeOwned;

// =============================================================================
// RECORDS
// =============================================================================

/// An entity that can be persisted.
pub trait Record: Serialize + DeserializeOwned {
    /// Table holding records of this type.
    const TABLE: &'static str;

    /// Primary key bytes.
    fn key(&self) -> Vec<u8>;
}

macro_rules! record {
    ($ty:ty, $table:literal) => {
        impl Record for $ty {
            const TABLE: &'static str = $table;

            fn key(&self) -> Vec<u8> {
                self.id.as_bytes().to_vec()
            }
        }
    };
}

record!(User, "users");
record!(Restaurant, "restaurants");
record!(Menu, "menus");
record!(QrCode, "qr_codes");
record!(QrCodeScan, "qr_code_scans");
record!(Notification, "notifications");

/// Every table a store must provide.
pub const TABLES: [&str; 8] = [
    User::TABLE,
    Restaurant::TABLE,
    Menu::TABLE,
    QrCode::TABLE,
    QrCodeScan::TABLE,
    Notification::TABLE,
    index::QR_CODES_BY_CODE,
    index::SCANS_BY_QR_CODE,
];

pub(crate) fn encode<R: Record>(record: &R) -> CoreResult<Vec<u8>> {
    Ok(postcard::to_allocvec(record)?)
}

pub(crate) fn decode<R: Record>(bytes: &[u8]) -> CoreResult<R> {
    Ok(postcard::from_bytes(bytes)?)
}

// =============================================================================
// BATCH
// =============================================================================

/// A single pending write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put {
        table: &'static str,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        table: &'static str,
        key: Vec<u8>,
    },
}

/// Writes applied atomically by [`Store::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    ops: Vec<WriteOp>,
}

impl Batch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an insert or overwrite.
    pub fn put<R: Record>(&mut self, record: &R) -> CoreResult<&mut Self> {
        self.ops.push(WriteOp::Put {
            table: R::TABLE,
            key: record.key(),
            value: encode(record)?,
        });
        Ok(self)
    }

    /// Queue a raw write, for index tables.
    pub fn put_raw(&mut self, table: &'static str, key: Vec<u8>, value: Vec<u8>) -> &mut Self {
        self.ops.push(WriteOp::Put { table, key, value });
        self
    }

    /// Queue a removal. Removing a missing key is not an error.
    pub fn delete<R: Record>(&mut self, record: &R) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            table: R::TABLE,
            key: record.key(),
        });
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Raw table access shared by all backends.
pub trait Store: Send + Sync {
    /// Value stored under `key`, if any.
    fn get_raw(&self, table: &'static str, key: &[u8]) -> CoreResult<Option<Vec<u8>>>;

    /// Every value in `table`, in key order.
    fn scan_raw(&self, table: &'static str) -> CoreResult<Vec<Vec<u8>>>;

    /// Entries of `table` whose key starts with `prefix`, in key order.
    fn scan_prefix_raw(
        &self,
        table: &'static str,
        prefix: &[u8],
    ) -> CoreResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Apply all writes of `batch`, or none of them.
    fn apply(&self, batch: Batch) -> CoreResult<()>;
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn get_raw(&self, table: &'static str, key: &[u8]) -> CoreResult<Option<Vec<u8>>> {
        (**self).get_raw(table, key)
    }

    fn scan_raw(&self, table: &'static str) -> CoreResult<Vec<Vec<u8>>> {
        (**self).scan_raw(table)
    }

    fn scan_prefix_raw(
        &self,
        table: &'static str,
        prefix: &[u8],
    ) -> CoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        (**self).scan_prefix_raw(table, prefix)
    }

    fn apply(&self, batch: Batch) -> CoreResult<()> {
        (**self).apply(batch)
    }
}

/// Typed helpers over [`Store`].
pub trait StoreExt: Store {
    fn get<R: Record>(&self, key: &[u8]) -> CoreResult<Option<R>> {
        self.get_raw(R::TABLE, key)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn all<R: Record>(&self) -> CoreResult<Vec<R>> {
        self.scan_raw(R::TABLE)?
            .iter()
            .map(|bytes| decode(bytes))
            .collect()
    }

    fn put<R: Record>(&self, record: &R) -> CoreResult<()> {
        let mut batch = Batch::new();
        batch.put(record)?;
        self.apply(batch)
    }

    fn delete<R: Record>(&self, record: &R) -> CoreResult<()> {
        let mut batch = Batch::new();
        batch.delete(record);
        self.apply(batch)
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn tables_are_distinct() {
        let mut names = TABLES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TABLES.len());
    }

    #[test]
    fn batch_collects_writes_in_order() {
        let user = User::from_login("0700000000", Utc::now());
        let mut batch = Batch::new();
        batch.put(&user).unwrap();
        batch.delete(&user);

        let ops = batch.into_ops();
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], WriteOp::Put { table: "users", .. }));
        assert!(matches!(ops[1], WriteOp::Delete { table: "users", .. }));
    }

    #[test]
    fn record_key_is_id_bytes() {
        let qr = QrCode::new("abcde", Utc::now());
        assert_eq!(qr.key(), qr.id.as_bytes().to_vec());
    }
}
