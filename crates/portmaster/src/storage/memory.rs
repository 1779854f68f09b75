//! In-memory backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use tracing::trace;

use crate::error::{Error, Result};

use super::{Batch, Mutation, Store, Table};

type Tables = HashMap<Table, BTreeMap<String, String>>;

/// Store kept in process memory.
///
/// Each instance is independent, so tests get a clean, deterministic store
/// without any shared state.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    sequences: Mutex<HashMap<Table, i64>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> Error {
        Error::internal("memory store lock poisoned")
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, table: Table, key: &str) -> Result<Option<String>> {
        trace!(%table, key, "get");
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables.get(&table).and_then(|rows| rows.get(key)).cloned())
    }

    async fn put(&self, table: Table, key: &str, value: String) -> Result<()> {
        trace!(%table, key, "put");
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        tables
            .entry(table)
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, table: Table, key: &str) -> Result<bool> {
        trace!(%table, key, "delete");
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        Ok(tables
            .get_mut(&table)
            .is_some_and(|rows| rows.remove(key).is_some()))
    }

    async fn scan(&self, table: Table) -> Result<Vec<String>> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables
            .get(&table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn apply(&self, batch: Batch) -> Result<()> {
        // One write lock for the whole batch; readers never see half of it.
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        for mutation in batch.into_mutations() {
            let Mutation { table, key, value } = mutation;
            tables.entry(table).or_default().insert(key, value);
        }
        Ok(())
    }

    async fn next_id(&self, table: Table) -> Result<i64> {
        let mut sequences = self.sequences.lock().map_err(|_| Self::poisoned())?;
        let next = sequences.entry(table).or_insert(0);
        *next += 1;
        Ok(*next)
    }
}
