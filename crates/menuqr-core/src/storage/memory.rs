//! In-memory [`Store`] backend.

use super::{Batch, Store, TABLES, WriteOp};
use crate::error::{CoreError, CoreResult};
use std::collections::BTreeMap;
use std::sync::RwLock;

type Table = BTreeMap<Vec<u8>, Vec<u8>>;

/// BTreeMap tables behind a single lock. Nothing survives the process.
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<&'static str, Table>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let tables = TABLES.iter().map(|name| (*name, Table::new())).collect();
        Self {
            tables: RwLock::new(tables),
        }
    }
}

fn unknown_table(table: &str) -> CoreError {
    CoreError::Storage(format!("Unknown table: {table}"))
}

impl Store for MemoryStore {
    fn get_raw(&self, table: &'static str, key: &[u8]) -> CoreResult<Option<Vec<u8>>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| CoreError::LockPoisoned("memory store"))?;
        let rows = tables.get(table).ok_or_else(|| unknown_table(table))?;
        Ok(rows.get(key).cloned())
    }

    fn scan_raw(&self, table: &'static str) -> CoreResult<Vec<Vec<u8>>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| CoreError::LockPoisoned("memory store"))?;
        let rows = tables.get(table).ok_or_else(|| unknown_table(table))?;
        Ok(rows.values().cloned().collect())
    }

    fn scan_prefix_raw(
        &self,
        table: &'static str,
        prefix: &[u8],
    ) -> CoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| CoreError::LockPoisoned("memory store"))?;
        let rows = tables.get(table).ok_or_else(|| unknown_table(table))?;
        Ok(rows
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn apply(&self, batch: Batch) -> CoreResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| CoreError::LockPoisoned("memory store"))?;

        // Validate first so a bad op leaves every table untouched.
        for op in batch.ops.iter() {
            let table = match op {
                WriteOp::Put { table, .. } | WriteOp::Delete { table, .. } => *table,
            };
            if !tables.contains_key(table) {
                return Err(unknown_table(table));
            }
        }

        for op in batch.into_ops() {
            match op {
                WriteOp::Put { table, key, value } => {
                    if let Some(rows) = tables.get_mut(table) {
                        rows.insert(key, value);
                    }
                }
                WriteOp::Delete { table, key } => {
                    if let Some(rows) = tables.get_mut(table) {
                        rows.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }
}
