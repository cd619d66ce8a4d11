//! SQLite storage backend
//!
//! Each record kind has its own table of JSON blobs keyed by id. The schema
//! version lives in `PRAGMA user_version`.

use crate::error::{StorageError, StorageResult};
use crate::migration::Migratable;
use crate::traits::StorageBackend;
use async_trait::async_trait;
use kinfolk_core::{
    ChangeSet, Document, EntityKind, Event, Family, FamilyTree, Person, Sequences,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Person => "persons",
        EntityKind::Family => "families",
        EntityKind::Event => "events",
        EntityKind::Document => "documents",
    }
}

impl SqliteStorage {
    /// Open or create a SQLite database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;

        let storage = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };
        storage.migrate_to_latest()?;

        Ok(storage)
    }

    /// Create an in-memory SQLite database (for testing)
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;

        let storage = Self {
            conn: Mutex::new(conn),
            path: None,
        };
        storage.migrate_to_latest()?;

        Ok(storage)
    }

    fn record_table_sql(kind: EntityKind) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY, data TEXT NOT NULL);",
            table_name(kind)
        )
    }
}

fn load_records<T: DeserializeOwned>(conn: &Connection, kind: EntityKind) -> StorageResult<Vec<T>> {
    let mut stmt = conn.prepare(&format!("SELECT data FROM {} ORDER BY id", table_name(kind)))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut records = Vec::new();
    for row in rows {
        records.push(serde_json::from_str(&row?)?);
    }
    Ok(records)
}

fn load_sequences(conn: &Connection) -> StorageResult<Sequences> {
    let mut sequences = Sequences::default();
    for kind in EntityKind::ALL {
        let value: Option<i64> = conn
            .query_row(
                "SELECT value FROM sequences WHERE kind = ?1",
                params![kind.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        sequences.set(kind, value.unwrap_or(0));
    }
    Ok(sequences)
}

fn upsert<T: Serialize>(conn: &Connection, kind: EntityKind, id: i64, record: &T) -> StorageResult<()> {
    let data = serde_json::to_string(record)?;
    conn.execute(
        &format!("INSERT OR REPLACE INTO {} (id, data) VALUES (?1, ?2)", table_name(kind)),
        params![id, data],
    )?;
    Ok(())
}

impl Migratable for SqliteStorage {
    fn get_schema_version(&self) -> StorageResult<u32> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;
        Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    fn set_schema_version(&self, version: u32) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;
        conn.pragma_update(None, "user_version", version)?;
        Ok(())
    }

    fn run_migration(&self, version: u32) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;
        let sql = match version {
            1 => format!(
                "{}\n{}\nCREATE TABLE IF NOT EXISTS sequences (kind TEXT PRIMARY KEY, value INTEGER NOT NULL);",
                Self::record_table_sql(EntityKind::Person),
                Self::record_table_sql(EntityKind::Family),
            ),
            2 => format!(
                "{}\n{}",
                Self::record_table_sql(EntityKind::Event),
                Self::record_table_sql(EntityKind::Document),
            ),
            other => {
                return Err(StorageError::Migration(format!(
                    "Unknown schema version {}",
                    other
                )))
            }
        };
        conn.execute_batch(&sql)?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for SqliteStorage {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;
        let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
        Ok(one == 1)
    }

    async fn load_tree(&self) -> StorageResult<FamilyTree> {
        let mut conn = self.conn.lock().map_err(StorageError::lock)?;
        let tx = conn.transaction()?;

        let tree = FamilyTree::from_records(
            load_records::<Person>(&tx, EntityKind::Person)?,
            load_records::<Family>(&tx, EntityKind::Family)?,
            load_records::<Event>(&tx, EntityKind::Event)?,
            load_records::<Document>(&tx, EntityKind::Document)?,
            load_sequences(&tx)?,
        );
        tx.commit()?;

        Ok(tree)
    }

    async fn commit(&self, changes: &ChangeSet) -> StorageResult<()> {
        let mut conn = self.conn.lock().map_err(StorageError::lock)?;
        let tx = conn.transaction()?;

        for (id, person) in &changes.persons {
            upsert(&tx, EntityKind::Person, id.get(), person)?;
        }
        for (id, family) in &changes.families {
            upsert(&tx, EntityKind::Family, id.get(), family)?;
        }
        for (id, event) in &changes.events {
            upsert(&tx, EntityKind::Event, id.get(), event)?;
        }
        for (id, document) in &changes.documents {
            upsert(&tx, EntityKind::Document, id.get(), document)?;
        }
        for entity in &changes.purged {
            tx.execute(
                &format!("DELETE FROM {} WHERE id = ?1", table_name(entity.kind())),
                params![entity.raw_id()],
            )?;
        }
        if let Some(sequences) = changes.sequences {
            for kind in EntityKind::ALL {
                tx.execute(
                    "INSERT OR REPLACE INTO sequences (kind, value) VALUES (?1, ?2)",
                    params![kind.as_str(), sequences.get(kind)],
                )?;
            }
        }

        // Dropping an uncommitted transaction rolls it back
        tx.commit()?;
        tracing::debug!(writes = changes.len(), "Committed change set to SQLite");
        Ok(())
    }

    fn database_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
