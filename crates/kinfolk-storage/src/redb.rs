//! ReDB storage backend

use crate::error::StorageResult;
use crate::migration::Migratable;
use crate::traits::StorageBackend;
use async_trait::async_trait;
use kinfolk_core::{
    ChangeSet, Document, EntityKind, Event, Family, FamilyTree, Person, Sequences,
};
use redb::{Database, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

// Table definitions
const PERSONS: TableDefinition<i64, &[u8]> = TableDefinition::new("persons");
const FAMILIES: TableDefinition<i64, &[u8]> = TableDefinition::new("families");
const EVENTS: TableDefinition<i64, &[u8]> = TableDefinition::new("events");
const DOCUMENTS: TableDefinition<i64, &[u8]> = TableDefinition::new("documents");
const SEQUENCES: TableDefinition<&str, i64> = TableDefinition::new("sequences");
const META: TableDefinition<&str, u32> = TableDefinition::new("meta");

const SCHEMA_VERSION_KEY: &str = "schema_version";

fn records_table(kind: EntityKind) -> TableDefinition<'static, i64, &'static [u8]> {
    match kind {
        EntityKind::Person => PERSONS,
        EntityKind::Family => FAMILIES,
        EntityKind::Event => EVENTS,
        EntityKind::Document => DOCUMENTS,
    }
}

/// ReDB storage backend
///
/// Readers get MVCC snapshots from redb, so they never wait on the writer.
pub struct RedbStorage {
    db: Database,
    path: PathBuf,
}

impl RedbStorage {
    /// Open or create a ReDB database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let db = Database::create(path)?;

        {
            let write_txn = db.begin_write()?;
            write_txn.open_table(META)?;
            write_txn.commit()?;
        }

        let storage = Self {
            db,
            path: path.to_path_buf(),
        };
        storage.migrate_to_latest()?;

        Ok(storage)
    }
}

fn read_records<T: DeserializeOwned>(txn: &ReadTransaction, kind: EntityKind) -> StorageResult<Vec<T>> {
    let table = txn.open_table(records_table(kind))?;

    let mut records = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        records.push(serde_json::from_slice(value.value())?);
    }
    Ok(records)
}

fn read_sequences(txn: &ReadTransaction) -> StorageResult<Sequences> {
    let table = txn.open_table(SEQUENCES)?;

    let mut sequences = Sequences::default();
    for kind in EntityKind::ALL {
        let value = table.get(kind.as_str())?.map(|v| v.value()).unwrap_or(0);
        sequences.set(kind, value);
    }
    Ok(sequences)
}

fn write_records<'r, T: Serialize + 'r>(
    txn: &WriteTransaction,
    kind: EntityKind,
    records: impl Iterator<Item = (i64, &'r T)>,
) -> StorageResult<()> {
    let mut table = txn.open_table(records_table(kind))?;
    for (id, record) in records {
        let value = serde_json::to_vec(record)?;
        table.insert(id, value.as_slice())?;
    }
    Ok(())
}

impl Migratable for RedbStorage {
    fn get_schema_version(&self) -> StorageResult<u32> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(META)?;
        let version = table.get(SCHEMA_VERSION_KEY)?.map(|v| v.value());
        Ok(version.unwrap_or(0))
    }

    fn set_schema_version(&self, version: u32) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(META)?;
            table.insert(SCHEMA_VERSION_KEY, version)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn run_migration(&self, version: u32) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        match version {
            1 => {
                write_txn.open_table(PERSONS)?;
                write_txn.open_table(FAMILIES)?;
                write_txn.open_table(SEQUENCES)?;
            }
            2 => {
                write_txn.open_table(EVENTS)?;
                write_txn.open_table(DOCUMENTS)?;
            }
            other => {
                return Err(crate::StorageError::Migration(format!(
                    "Unknown schema version {}",
                    other
                )))
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for RedbStorage {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        read_txn.open_table(META)?;
        Ok(true)
    }

    async fn load_tree(&self) -> StorageResult<FamilyTree> {
        let read_txn = self.db.begin_read()?;

        Ok(FamilyTree::from_records(
            read_records::<Person>(&read_txn, EntityKind::Person)?,
            read_records::<Family>(&read_txn, EntityKind::Family)?,
            read_records::<Event>(&read_txn, EntityKind::Event)?,
            read_records::<Document>(&read_txn, EntityKind::Document)?,
            read_sequences(&read_txn)?,
        ))
    }

    async fn commit(&self, changes: &ChangeSet) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;

        write_records(
            &write_txn,
            EntityKind::Person,
            changes.persons.iter().map(|(id, p)| (id.get(), p)),
        )?;
        write_records(
            &write_txn,
            EntityKind::Family,
            changes.families.iter().map(|(id, f)| (id.get(), f)),
        )?;
        write_records(
            &write_txn,
            EntityKind::Event,
            changes.events.iter().map(|(id, e)| (id.get(), e)),
        )?;
        write_records(
            &write_txn,
            EntityKind::Document,
            changes.documents.iter().map(|(id, d)| (id.get(), d)),
        )?;
        for entity in &changes.purged {
            let mut table = write_txn.open_table(records_table(entity.kind()))?;
            table.remove(entity.raw_id())?;
        }
        if let Some(sequences) = changes.sequences {
            let mut table = write_txn.open_table(SEQUENCES)?;
            for kind in EntityKind::ALL {
                table.insert(kind.as_str(), sequences.get(kind))?;
            }
        }

        write_txn.commit()?;
        tracing::debug!(writes = changes.len(), "Committed change set to ReDB");
        Ok(())
    }

    fn database_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::CURRENT_VERSION;
    use crate::testing::exercise_backend;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_redb_storage() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("tree.redb");

        let storage = RedbStorage::open(&db_path).unwrap();
        exercise_backend(&storage).await;
        assert_eq!(storage.get_schema_version().unwrap(), CURRENT_VERSION);
    }

    #[tokio::test]
    async fn test_redb_reopen_keeps_records() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("tree.redb");

        let expected = {
            let storage = RedbStorage::open(&db_path).unwrap();
            exercise_backend(&storage).await;
            storage.load_tree().await.unwrap()
        };

        let storage = RedbStorage::open(&db_path).unwrap();
        assert_eq!(storage.load_tree().await.unwrap(), expected);
    }
}
