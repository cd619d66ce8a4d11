//! Kinfolk Storage - Persistence for the family tree
//!
//! This crate provides the storage backends, the transactional
//! [`TreeStore`] that implements [`kinfolk_core::Genealogy`] on top of any
//! backend, and the backup manager.

#![allow(clippy::result_large_err)]

pub mod backup;
pub mod error;
pub mod migration;
pub mod store;
pub mod traits;

#[cfg(feature = "redb")]
pub mod redb;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod memory;

#[cfg(test)]
mod testing;

pub use backup::{BackupInfo, BackupManager, BackupStats, BackupTrigger};
pub use error::{StorageError, StorageResult};
pub use migration::{Migratable, SchemaVersion, CURRENT_VERSION};
pub use store::TreeStore;
pub use traits::StorageBackend;

#[cfg(feature = "redb")]
pub use redb::RedbStorage;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;

pub use memory::MemoryStorage;
