//! Transactional family tree store
//!
//! [`TreeStore`] runs one writer at a time: it loads a snapshot, plans the
//! mutation against it with a [`Transaction`] and commits the resulting
//! change set through the backend in one atomic step. Readers load their
//! own snapshot and never see a half-applied mutation.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use kinfolk_core::{
    Document, DocumentId, EntityRef, Event, EventId, Family, FamilyId, FamilyPatch, FamilyTree,
    Genealogy, NewDocument, NewEvent, NewFamily, NewPerson, Person, PersonId, PersonPatch, Result,
    Transaction,
};

use crate::traits::StorageBackend;

pub struct TreeStore<B: StorageBackend + ?Sized> {
    backend: Arc<B>,
    writer: Mutex<()>,
}

impl<B: StorageBackend + ?Sized> TreeStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            writer: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Plan several mutations against one snapshot and commit them together.
    ///
    /// Later steps see the records created by earlier ones. If `f` fails
    /// nothing is written.
    pub async fn transact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T> + Send,
        T: Send,
    {
        let _guard = self.writer.lock().await;
        let tree = self.backend.load_tree().await?;

        let (value, changes) = {
            let mut tx = Transaction::begin(&tree);
            let value = f(&mut tx)?;
            (value, tx.into_changes())
        };

        if !changes.is_empty() {
            self.backend.commit(&changes).await?;
            debug!(writes = changes.len(), "Committed transaction");
        }
        Ok(value)
    }
}

#[async_trait]
impl<B: StorageBackend + ?Sized> Genealogy for TreeStore<B> {
    async fn create_person(&self, person: NewPerson) -> Result<Person> {
        let person = self.transact(move |tx| tx.create_person(person)).await?;
        info!("Created person {}", person.id);
        Ok(person)
    }

    async fn update_person(&self, id: PersonId, patch: PersonPatch) -> Result<Person> {
        let person = self.transact(move |tx| tx.update_person(id, patch)).await?;
        debug!("Updated person {}", id);
        Ok(person)
    }

    async fn delete_person(&self, id: PersonId) -> Result<()> {
        self.transact(move |tx| tx.delete_person(id)).await?;
        info!("Moved person {} to the trash", id);
        Ok(())
    }

    async fn create_family(&self, family: NewFamily) -> Result<Family> {
        let family = self.transact(move |tx| tx.create_family(family)).await?;
        info!("Created family {}", family.id);
        Ok(family)
    }

    async fn update_family(&self, id: FamilyId, patch: FamilyPatch) -> Result<Family> {
        let family = self.transact(move |tx| tx.update_family(id, patch)).await?;
        debug!("Updated family {}", id);
        Ok(family)
    }

    async fn delete_family(&self, id: FamilyId) -> Result<()> {
        self.transact(move |tx| tx.delete_family(id)).await?;
        info!("Moved family {} to the trash", id);
        Ok(())
    }

    async fn attach_child(&self, family: FamilyId, child: PersonId) -> Result<Person> {
        let person = self
            .transact(move |tx| tx.attach_child(family, child))
            .await?;
        debug!("Attached person {} to family {}", child, family);
        Ok(person)
    }

    async fn detach_child(&self, child: PersonId) -> Result<Person> {
        let person = self.transact(move |tx| tx.detach_child(child)).await?;
        debug!("Detached person {} from its parent family", child);
        Ok(person)
    }

    async fn create_event(&self, event: NewEvent) -> Result<Event> {
        let event = self.transact(move |tx| tx.create_event(event)).await?;
        debug!("Created event {} for person {}", event.id, event.person);
        Ok(event)
    }

    async fn delete_event(&self, id: EventId) -> Result<()> {
        self.transact(move |tx| tx.delete_event(id)).await
    }

    async fn create_document(&self, document: NewDocument) -> Result<Document> {
        let document = self.transact(move |tx| tx.create_document(document)).await?;
        debug!("Created document {}", document.id);
        Ok(document)
    }

    async fn delete_document(&self, id: DocumentId) -> Result<()> {
        self.transact(move |tx| tx.delete_document(id)).await
    }

    async fn restore(&self, entity: EntityRef) -> Result<()> {
        self.transact(move |tx| tx.restore(entity)).await?;
        info!("Restored {}", entity);
        Ok(())
    }

    async fn purge(&self, entity: EntityRef) -> Result<()> {
        self.transact(move |tx| tx.purge(entity)).await?;
        info!("Permanently deleted {}", entity);
        Ok(())
    }

    async fn snapshot(&self) -> Result<FamilyTree> {
        Ok(self.backend.load_tree().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;
    use kinfolk_core::{Error, EventKind};

    fn store() -> TreeStore<MemoryStorage> {
        TreeStore::new(Arc::new(MemoryStorage::new()))
    }

    /// Alice + Bob with children Carol and Dave
    async fn nuclear_family(store: &TreeStore<MemoryStorage>) -> (Person, Person, Family) {
        let alice = store.create_person(NewPerson::new("Alice", "Smith")).await.unwrap();
        let bob = store.create_person(NewPerson::new("Bob", "Smith")).await.unwrap();
        let family = store
            .create_family(NewFamily::union(alice.id, bob.id))
            .await
            .unwrap();
        store
            .create_person(NewPerson::new("Carol", "Smith").child_of(family.id))
            .await
            .unwrap();
        store
            .create_person(NewPerson::new("Dave", "Smith").child_of(family.id))
            .await
            .unwrap();
        (alice, bob, family)
    }

    #[tokio::test]
    async fn test_kinship_queries() {
        let store = store();
        let (alice, bob, _) = nuclear_family(&store).await;
        let carol = PersonId(3);

        let parents = store.parents_of(carol).await.unwrap();
        assert_eq!(
            parents.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![alice.id, bob.id]
        );
        let children = store.children_of(parents[0].id).await.unwrap();
        assert!(children.iter().any(|c| c.id == carol));

        let siblings = store.siblings_of(carol).await.unwrap();
        assert_eq!(siblings.len(), 1);
        assert_eq!(siblings[0].name.first, "Dave");

        let partners = store.partners_of(alice.id).await.unwrap();
        assert_eq!(partners[0].id, bob.id);
    }

    #[tokio::test]
    async fn test_rejected_mutation_writes_nothing() {
        let store = store();
        let (alice, _, _) = nuclear_family(&store).await;
        let before = store.snapshot().await.unwrap();

        let err = store
            .create_family(NewFamily::union(alice.id, alice.id))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SelfUnion(_)));

        // Carol heads a family; making Alice her child closes a cycle
        let carol_family = store
            .create_family(NewFamily::single_parent(PersonId(3)))
            .await
            .unwrap();
        let before_cycle = store.snapshot().await.unwrap();
        let err = store.attach_child(carol_family.id, alice.id).await.unwrap_err();
        assert!(matches!(err, Error::CycleDetected(_)));
        assert_eq!(store.snapshot().await.unwrap(), before_cycle);
        assert_ne!(before, before_cycle);
    }

    #[tokio::test]
    async fn test_transact_is_all_or_nothing() {
        let store = store();
        let result: Result<()> = store
            .transact(|tx| {
                tx.create_person(NewPerson::new("Eve", "Adams"))?;
                tx.create_family(NewFamily::union(PersonId(1), PersonId(99)))?;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(Error::DanglingReference { .. })));
        assert!(store.persons().await.unwrap().is_empty());

        // Later steps see earlier ones
        let family = store
            .transact(|tx| {
                let a = tx.create_person(NewPerson::new("Eve", "Adams"))?;
                let b = tx.create_person(NewPerson::new("Adam", "Adams"))?;
                tx.create_family(NewFamily::union(a.id, b.id))
            })
            .await
            .unwrap();
        assert_eq!(family.partner1, Some(PersonId(1)));
        assert_eq!(store.persons().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_trash_round_trip() {
        let store = store();
        let (_, _, family) = nuclear_family(&store).await;
        let carol = PersonId(3);
        store
            .create_event(NewEvent::new(carol, EventKind::Graduation))
            .await
            .unwrap();

        store.delete_person(carol).await.unwrap();
        assert!(matches!(
            store.person(carol).await,
            Err(Error::NotFound(EntityRef::Person(_)))
        ));
        assert_eq!(store.children_of(PersonId(1)).await.unwrap().len(), 1);
        let trash = store.trash().await.unwrap();
        assert_eq!(trash[0].entity, EntityRef::Person(carol));

        store.restore(EntityRef::Person(carol)).await.unwrap();
        let restored = store.person(carol).await.unwrap();
        assert_eq!(restored.parent_family, Some(family.id));
        assert_eq!(store.events_for(carol).await.unwrap().len(), 1);

        store.delete_person(carol).await.unwrap();
        store.purge(EntityRef::Person(carol)).await.unwrap();
        let tree = store.snapshot().await.unwrap();
        assert!(!tree.persons.contains_key(&carol));
        assert!(tree.events.is_empty());
    }

    #[tokio::test]
    async fn test_lineage_through_store() {
        let store = store();
        let (alice, _, _) = nuclear_family(&store).await;
        let report = store.descendants_of(alice.id, 10).await.unwrap();
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.entries[0].person.id, alice.id);

        let generations = store.assign_generations(alice.id).await.unwrap();
        assert_eq!(generations.get(PersonId(2)), Some(0));
        assert_eq!(generations.get(PersonId(4)), Some(1));

        let root = store.find_root(PersonId(4)).await.unwrap();
        assert_eq!(root.id, alice.id);
        store.check_integrity().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_writers_get_distinct_ids() {
        let store = Arc::new(store());
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create_person(NewPerson::new(format!("Child{}", i), "Smith"))
                    .await
                    .unwrap()
                    .id
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }
}
