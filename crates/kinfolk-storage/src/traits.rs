//! Storage backend trait definitions

use std::path::Path;

use crate::error::StorageResult;
use async_trait::async_trait;
use kinfolk_core::{ChangeSet, FamilyTree};

/// Trait for storage backend implementations
///
/// A backend stores whole records keyed by kind and id. It never checks
/// kinship rules itself: change sets arrive already validated by a
/// [`kinfolk_core::Transaction`].
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Initialize the storage (create tables, etc.)
    async fn initialize(&self) -> StorageResult<()>;

    /// Close the storage connection
    async fn close(&self) -> StorageResult<()>;

    /// Health check
    async fn health_check(&self) -> StorageResult<bool>;

    /// Load every stored record, trashed ones included, plus the id
    /// sequences, as one consistent snapshot
    async fn load_tree(&self) -> StorageResult<FamilyTree>;

    /// Write a change set atomically: upserts, purges and sequence updates
    /// all land together or not at all
    async fn commit(&self, changes: &ChangeSet) -> StorageResult<()>;

    /// File holding the data, for backends that have one
    fn database_path(&self) -> Option<&Path> {
        None
    }
}
