//! Storage layer for portmaster.
//!
//! All records live in a key/value [`Store`] with one keyspace per
//! [`Table`]. Values are JSON documents. A deployment runs against exactly
//! one backend:
//!
//! - [`SqliteStore`] persists to a `SQLite` file.
//! - [`MemoryStore`] keeps everything in process memory, for tests and demos.
//!
//! Writes that must land together go through [`Store::apply`] as a
//! [`Batch`], which a backend commits all-or-nothing.

mod memory;
pub mod migrations;
pub mod schema;
mod sqlite;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{Config, StorageBackend};
use crate::error::Result;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A keyspace in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    /// Operator accounts, keyed by lowercase email.
    Users,
    /// Fisher registry, keyed by `fisher_id`.
    Fishers,
    /// Catch records, keyed by numeric id.
    Catches,
    /// Scan audit trail, keyed by numeric log id.
    NfcLogs,
    /// Completed renewals, keyed by transaction id.
    Renewals,
    /// Exported reports, keyed by report id.
    Reports,
}

impl Table {
    /// Every table, in schema order.
    pub const ALL: [Table; 6] = [
        Table::Users,
        Table::Fishers,
        Table::Catches,
        Table::NfcLogs,
        Table::Renewals,
        Table::Reports,
    ];

    /// SQL table name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Fishers => "fishers",
            Self::Catches => "catches",
            Self::NfcLogs => "nfc_logs",
            Self::Renewals => "renewals",
            Self::Reports => "reports",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One insert-or-replace inside a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    /// Target table.
    pub table: Table,
    /// Primary key.
    pub key: String,
    /// JSON document.
    pub value: String,
}

/// Writes committed atomically by [`Store::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    mutations: Vec<Mutation>,
}

impl Batch {
    /// An empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a record for insert-or-replace.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized.
    pub fn put<R: Record>(&mut self, record: &R) -> Result<&mut Self> {
        self.mutations.push(Mutation {
            table: R::TABLE,
            key: record.key(),
            value: serde_json::to_string(record)?,
        });
        Ok(self)
    }

    /// Number of queued writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// The queued writes, in order.
    #[must_use]
    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}

/// The single storage capability every backend provides.
#[async_trait]
pub trait Store: Send + Sync + fmt::Debug {
    /// Backend name, for logs and transport errors.
    fn backend(&self) -> &'static str;

    /// Fetch the value stored under `key`.
    async fn get(&self, table: Table, key: &str) -> Result<Option<String>>;

    /// Insert or replace the value under `key`.
    async fn put(&self, table: Table, key: &str, value: String) -> Result<()>;

    /// Remove `key`. Returns whether it existed.
    async fn delete(&self, table: Table, key: &str) -> Result<bool>;

    /// Every value in the table, in key order.
    async fn scan(&self, table: Table) -> Result<Vec<String>>;

    /// Commit all mutations or none of them.
    async fn apply(&self, batch: Batch) -> Result<()>;

    /// Allocate the next numeric id for the table. Ids start at 1.
    async fn next_id(&self, table: Table) -> Result<i64>;
}

/// A type stored as a JSON document in one table.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Table the record lives in.
    const TABLE: Table;

    /// Primary key of this record.
    fn key(&self) -> String;
}

/// Load one record by key.
///
/// # Errors
///
/// Returns an error if the store fails or the stored document is malformed.
pub async fn load<R: Record>(store: &dyn Store, key: &str) -> Result<Option<R>> {
    match store.get(R::TABLE, key).await? {
        Some(value) => Ok(Some(serde_json::from_str(&value)?)),
        None => Ok(None),
    }
}

/// Load every record of a table, in key order.
///
/// # Errors
///
/// Returns an error if the store fails or a stored document is malformed.
pub async fn load_all<R: Record>(store: &dyn Store) -> Result<Vec<R>> {
    store
        .scan(R::TABLE)
        .await?
        .iter()
        .map(|value| serde_json::from_str(value).map_err(Into::into))
        .collect()
}

/// Insert or replace one record.
///
/// # Errors
///
/// Returns an error if serialization or the store fails.
pub async fn save<R: Record>(store: &dyn Store, record: &R) -> Result<()> {
    let value = serde_json::to_string(record)?;
    store.put(R::TABLE, &record.key(), value).await
}

/// Open the backend selected by the configuration.
///
/// # Errors
///
/// Returns an error if the `SQLite` database cannot be opened.
pub fn open_store(config: &Config) -> Result<Arc<dyn Store>> {
    match config.storage.backend {
        StorageBackend::Sqlite => Ok(Arc::new(SqliteStore::open(config.database_path())?)),
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
