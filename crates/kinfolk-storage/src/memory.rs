//! In-memory storage backend for testing

use crate::error::{StorageError, StorageResult};
use crate::traits::StorageBackend;
use async_trait::async_trait;
use kinfolk_core::{ChangeSet, FamilyTree};
use std::sync::RwLock;

/// In-memory storage backend
///
/// Useful for testing and temporary storage.
pub struct MemoryStorage {
    tree: RwLock<FamilyTree>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(FamilyTree::new()),
        }
    }

    /// Start from an existing tree
    pub fn with_tree(tree: FamilyTree) -> Self {
        Self {
            tree: RwLock::new(tree),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        Ok(!self.tree.is_poisoned())
    }

    async fn load_tree(&self) -> StorageResult<FamilyTree> {
        let tree = self.tree.read().map_err(StorageError::lock)?;
        Ok(tree.clone())
    }

    async fn commit(&self, changes: &ChangeSet) -> StorageResult<()> {
        let mut tree = self.tree.write().map_err(StorageError::lock)?;
        tree.apply(changes);
        Ok(())
    }
}
