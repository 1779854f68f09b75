//! `SQLite` backend.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, trace};

use crate::error::{Error, Result};

use super::{migrations, Batch, Store, Table};

/// Store persisted in a `SQLite` database.
///
/// The connection is shared behind a mutex and every call runs on the
/// blocking thread pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// then brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::internal("sqlite connection lock poisoned"))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| Error::internal(format!("sqlite task failed: {e}")))?
    }
}

fn put_row(conn: &Connection, table: Table, key: &str, value: &str) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {table} (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')"
        ),
        params![key, value],
    )?;
    Ok(())
}

fn delete_row(conn: &Connection, table: Table, key: &str) -> Result<bool> {
    let affected = conn.execute(&format!("DELETE FROM {table} WHERE key = ?1"), [key])?;
    Ok(affected > 0)
}

#[async_trait]
impl Store for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, table: Table, key: &str) -> Result<Option<String>> {
        trace!(%table, key, "get");
        let key = key.to_string();
        self.with_conn(move |conn| {
            let value = conn
                .query_row(
                    &format!("SELECT value FROM {table} WHERE key = ?1"),
                    [&key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn put(&self, table: Table, key: &str, value: String) -> Result<()> {
        trace!(%table, key, "put");
        let key = key.to_string();
        self.with_conn(move |conn| put_row(conn, table, &key, &value))
            .await
    }

    async fn delete(&self, table: Table, key: &str) -> Result<bool> {
        trace!(%table, key, "delete");
        let key = key.to_string();
        self.with_conn(move |conn| delete_row(conn, table, &key))
            .await
    }

    async fn scan(&self, table: Table) -> Result<Vec<String>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!("SELECT value FROM {table} ORDER BY key"))?;
            let values = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(values)
        })
        .await
    }

    async fn apply(&self, batch: Batch) -> Result<()> {
        let count = batch.len();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            for mutation in batch.into_mutations() {
                put_row(&tx, mutation.table, &mutation.key, &mutation.value)?;
            }
            tx.commit()?;
            Ok(())
        })
        .await?;
        debug!("Committed batch of {} writes", count);
        Ok(())
    }

    async fn next_id(&self, table: Table) -> Result<i64> {
        self.with_conn(move |conn| {
            let id = conn.query_row(
                "INSERT INTO sequences (name, value) VALUES (?1, 1)
                 ON CONFLICT(name) DO UPDATE SET value = value + 1
                 RETURNING value",
                [table.name()],
                |row| row.get(0),
            )?;
            Ok(id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Mutation;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("failed to create test store")
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = create_test_store();
        store
            .put(Table::Fishers, "F1001", r#"{"a":1}"#.to_string())
            .await
            .unwrap();

        let value = store.get(Table::Fishers, "F1001").await.unwrap();
        assert_eq!(value.as_deref(), Some(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let store = create_test_store();
        store.put(Table::Fishers, "F1", "old".to_string()).await.unwrap();
        store.put(Table::Fishers, "F1", "new".to_string()).await.unwrap();

        assert_eq!(store.scan(Table::Fishers).await.unwrap(), vec!["new"]);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let store = create_test_store();
        assert!(store.get(Table::Renewals, "TRX-0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = create_test_store();
        store.put(Table::Fishers, "F1", "x".to_string()).await.unwrap();

        assert!(store.delete(Table::Fishers, "F1").await.unwrap());
        assert!(!store.delete(Table::Fishers, "F1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unicode_values() {
        let store = create_test_store();
        let value = r#"{"name":"محمد أمين"}"#.to_string();
        store.put(Table::Fishers, "F1", value.clone()).await.unwrap();

        assert_eq!(store.get(Table::Fishers, "F1").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_apply_is_atomic() {
        let store = create_test_store();
        store.put(Table::Fishers, "F1", "before".to_string()).await.unwrap();

        // Drop the renewals table so the second write of the batch fails.
        store
            .with_conn(|conn| {
                conn.execute("DROP TABLE renewals", [])?;
                Ok(())
            })
            .await
            .unwrap();

        let mut batch = Batch::new();
        batch.mutations.push(Mutation {
            table: Table::Fishers,
            key: "F1".to_string(),
            value: "after".to_string(),
        });
        batch.mutations.push(Mutation {
            table: Table::Renewals,
            key: "TRX-1".to_string(),
            value: "{}".to_string(),
        });

        assert!(store.apply(batch).await.is_err());
        assert_eq!(
            store.get(Table::Fishers, "F1").await.unwrap().as_deref(),
            Some("before")
        );
    }

    #[tokio::test]
    async fn test_next_id_increments() {
        let store = create_test_store();
        assert_eq!(store.next_id(Table::Catches).await.unwrap(), 1);
        assert_eq!(store.next_id(Table::Catches).await.unwrap(), 2);
        assert_eq!(store.next_id(Table::NfcLogs).await.unwrap(), 1);
    }

    #[test]
    fn test_path_in_memory() {
        let store = create_test_store();
        assert_eq!(store.path().to_string_lossy(), ":memory:");
    }

    #[tokio::test]
    async fn test_open_file_based_persists() {
        let db_path = std::env::temp_dir().join(format!(
            "portmaster_test_{}.db",
            std::process::id()
        ));

        {
            let store = SqliteStore::open(&db_path).unwrap();
            store.put(Table::Fishers, "F1", "x".to_string()).await.unwrap();
            assert_eq!(store.next_id(Table::Catches).await.unwrap(), 1);
            assert_eq!(store.path(), db_path);
        }

        let reopened = SqliteStore::open(&db_path).unwrap();
        assert_eq!(
            reopened.get(Table::Fishers, "F1").await.unwrap().as_deref(),
            Some("x")
        );
        assert_eq!(reopened.next_id(Table::Catches).await.unwrap(), 2);

        drop(reopened);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let nested_path = std::env::temp_dir().join(format!(
            "portmaster_test_{}/nested/port.db",
            std::process::id()
        ));
        if let Some(parent) = nested_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }

        let store = SqliteStore::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(store);
        if let Some(root) = nested_path.parent().and_then(Path::parent) {
            let _ = std::fs::remove_dir_all(root);
        }
    }
}
