//! Checks shared by every backend's tests

use crate::traits::StorageBackend;
use kinfolk_core::{ChangeSet, EntityRef, FamilyTree, NewFamily, NewPerson, PersonId, Transaction};

pub(crate) fn plan(
    base: &FamilyTree,
    f: impl FnOnce(&mut Transaction) -> kinfolk_core::Result<()>,
) -> ChangeSet {
    let mut tx = Transaction::begin(base);
    f(&mut tx).unwrap();
    tx.into_changes()
}

/// Commit a small family, then trash and purge one of its members,
/// checking the loaded tree after every step
pub(crate) async fn exercise_backend(backend: &dyn StorageBackend) {
    backend.initialize().await.unwrap();
    assert!(backend.health_check().await.unwrap());

    let empty = backend.load_tree().await.unwrap();
    assert!(empty.persons.is_empty());

    let changes = plan(&empty, |tx| {
        let alice = tx.create_person(NewPerson::new("Alice", "Smith"))?;
        let bob = tx.create_person(NewPerson::new("Bob", "Smith"))?;
        let family = tx.create_family(NewFamily::union(alice.id, bob.id))?;
        tx.create_person(NewPerson::new("Carol", "Smith").child_of(family.id))?;
        Ok(())
    });
    backend.commit(&changes).await.unwrap();

    let mut expected = empty.clone();
    expected.apply(&changes);
    let loaded = backend.load_tree().await.unwrap();
    assert_eq!(loaded, expected);
    assert_eq!(loaded.sequences.person, 3);
    assert_eq!(loaded.sequences.family, 1);

    let changes = plan(&loaded, |tx| tx.delete_person(PersonId(3)));
    backend.commit(&changes).await.unwrap();
    let loaded = backend.load_tree().await.unwrap();
    assert!(loaded.persons[&PersonId(3)].is_deleted());

    let changes = plan(&loaded, |tx| tx.purge(EntityRef::Person(PersonId(3))));
    backend.commit(&changes).await.unwrap();
    let loaded = backend.load_tree().await.unwrap();
    assert_eq!(loaded.persons.len(), 2);
    assert!(!loaded.persons.contains_key(&PersonId(3)));
    // Purged ids are never handed out again
    assert_eq!(loaded.sequences.person, 3);
}
