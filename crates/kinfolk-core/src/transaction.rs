//! Mutation planning
//!
//! A [`Transaction`] overlays pending writes on a loaded [`FamilyTree`].
//! Every operation validates against the overlay before writing to it, so a
//! failed operation leaves the pending writes untouched. The resulting
//! [`ChangeSet`] is committed by a storage backend in one atomic step.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::document::{Document, NewDocument};
use crate::error::{Error, Result};
use crate::event::{Event, NewEvent};
use crate::family::{Family, FamilyPatch, NewFamily};
use crate::ids::{DocumentId, EventId, FamilyId, PersonId};
use crate::person::{NewPerson, Person, PersonPatch};
use crate::rules::{
    check_acyclic, check_family_partners, check_live_family, check_live_person, stored_children,
    TreeView,
};
use crate::tree::{ChangeSet, EntityRef, FamilyTree, Sequences};

pub struct Transaction<'a> {
    base: &'a FamilyTree,
    changes: ChangeSet,
    sequences: Sequences,
    now: DateTime<Utc>,
}

impl<'a> Transaction<'a> {
    pub fn begin(base: &'a FamilyTree) -> Self {
        Self::begin_at(base, Utc::now())
    }

    /// Start a transaction whose writes are stamped with `now`
    pub fn begin_at(base: &'a FamilyTree, now: DateTime<Utc>) -> Self {
        Self {
            base,
            changes: ChangeSet::default(),
            sequences: base.sequences,
            now,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Finish planning and hand back the pending writes
    pub fn into_changes(self) -> ChangeSet {
        let mut changes = self.changes;
        if self.sequences != self.base.sequences {
            changes.sequences = Some(self.sequences);
        }
        changes
    }

    fn is_purged(&self, entity: EntityRef) -> bool {
        self.changes.purged.contains(&entity)
    }

    // ---- overlay reads ----

    pub fn person(&self, id: PersonId) -> Option<&Person> {
        if self.is_purged(EntityRef::Person(id)) {
            return None;
        }
        self.changes
            .persons
            .get(&id)
            .or_else(|| self.base.persons.get(&id))
    }

    pub fn family(&self, id: FamilyId) -> Option<&Family> {
        if self.is_purged(EntityRef::Family(id)) {
            return None;
        }
        self.changes
            .families
            .get(&id)
            .or_else(|| self.base.families.get(&id))
    }

    pub fn event(&self, id: EventId) -> Option<&Event> {
        if self.is_purged(EntityRef::Event(id)) {
            return None;
        }
        self.changes
            .events
            .get(&id)
            .or_else(|| self.base.events.get(&id))
    }

    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        if self.is_purged(EntityRef::Document(id)) {
            return None;
        }
        self.changes
            .documents
            .get(&id)
            .or_else(|| self.base.documents.get(&id))
    }

    pub fn live_person(&self, id: PersonId) -> Result<&Person> {
        self.person(id)
            .filter(|p| !p.is_deleted())
            .ok_or(Error::NotFound(EntityRef::Person(id)))
    }

    pub fn live_family(&self, id: FamilyId) -> Result<&Family> {
        self.family(id)
            .filter(|f| !f.is_deleted())
            .ok_or(Error::NotFound(EntityRef::Family(id)))
    }

    /// All stored families in the overlay, trashed ones included
    fn families(&self) -> impl Iterator<Item = &Family> {
        self.base
            .families
            .values()
            .filter(|f| {
                !self.changes.families.contains_key(&f.id)
                    && !self.is_purged(EntityRef::Family(f.id))
            })
            .chain(self.changes.families.values())
    }

    fn events(&self) -> impl Iterator<Item = &Event> {
        self.base
            .events
            .values()
            .filter(|e| {
                !self.changes.events.contains_key(&e.id) && !self.is_purged(EntityRef::Event(e.id))
            })
            .chain(self.changes.events.values())
    }

    fn documents(&self) -> impl Iterator<Item = &Document> {
        self.base
            .documents
            .values()
            .filter(|d| {
                !self.changes.documents.contains_key(&d.id)
                    && !self.is_purged(EntityRef::Document(d.id))
            })
            .chain(self.changes.documents.values())
    }

    fn put_person(&mut self, person: Person) {
        self.changes.persons.insert(person.id, person);
    }

    fn put_family(&mut self, family: Family) {
        self.changes.families.insert(family.id, family);
    }

    // ---- persons ----

    pub fn create_person(&mut self, new: NewPerson) -> Result<Person> {
        let mut person = new.into_person(PersonId(0), self.now);
        person.validate()?;
        if let Some(family) = person.parent_family {
            check_live_family(&*self, "parent_family", family)?;
        }
        if let Some(family) = person.adoptive_family {
            check_live_family(&*self, "adoptive_family", family)?;
        }
        // A brand-new person has no descendants, so no cycle is possible.
        person.id = self.sequences.next_person();
        debug!(id = %person.id, "Created person");
        self.put_person(person.clone());
        Ok(person)
    }

    pub fn update_person(&mut self, id: PersonId, patch: PersonPatch) -> Result<Person> {
        let current = self.live_person(id)?;
        let old_parent_family = current.parent_family;
        let old_adoptive_family = current.adoptive_family;

        let mut person = current.clone();
        patch.apply_to(&mut person);
        person.validate()?;

        if person.parent_family != old_parent_family {
            if let Some(family) = person.parent_family {
                self.check_can_join(id, family, "parent_family")?;
            }
        }
        if person.adoptive_family != old_adoptive_family {
            if let Some(family) = person.adoptive_family {
                check_live_family(&*self, "adoptive_family", family)?;
            }
        }

        person.updated_at = self.now;
        debug!(id = %id, "Updated person");
        self.put_person(person.clone());
        Ok(person)
    }

    /// Move a person into the trash. Relationships are left in place.
    pub fn delete_person(&mut self, id: PersonId) -> Result<()> {
        let mut person = self.live_person(id)?.clone();
        person.deleted_at = Some(self.now);
        debug!(id = %id, "Moved person to trash");
        self.put_person(person);
        Ok(())
    }

    /// Record `child` as a child of `family`, replacing any previous parent family
    pub fn attach_child(&mut self, family: FamilyId, child: PersonId) -> Result<Person> {
        let mut person = self.live_person(child)?.clone();
        self.live_family(family)?;
        self.check_can_join(child, family, "parent_family")?;
        person.parent_family = Some(family);
        person.updated_at = self.now;
        debug!(family = %family, child = %child, "Attached child");
        self.put_person(person.clone());
        Ok(person)
    }

    pub fn detach_child(&mut self, child: PersonId) -> Result<Person> {
        let mut person = self.live_person(child)?.clone();
        if person.parent_family.take().is_some() {
            person.updated_at = self.now;
            debug!(child = %child, "Detached child");
            self.put_person(person.clone());
        }
        Ok(person)
    }

    /// `family` must be live and `child` must not be an ancestor of its partners
    fn check_can_join(&self, child: PersonId, family: FamilyId, field: &'static str) -> Result<()> {
        check_live_family(&*self, field, family)?;
        let partners: Vec<PersonId> = self
            .family(family)
            .map(|f| f.partners().collect())
            .unwrap_or_default();
        check_acyclic(&*self, &partners, &[child])
    }

    // ---- families ----

    pub fn create_family(&mut self, new: NewFamily) -> Result<Family> {
        let mut family = new.into_family(FamilyId(0), self.now);
        family.validate()?;
        check_family_partners(&*self, family.partner1, family.partner2)?;
        family.id = self.sequences.next_family();
        debug!(id = %family.id, "Created family");
        self.put_family(family.clone());
        Ok(family)
    }

    pub fn update_family(&mut self, id: FamilyId, patch: FamilyPatch) -> Result<Family> {
        let current = self.live_family(id)?;
        let (old1, old2) = (current.partner1, current.partner2);
        let touches_partners = patch.touches_partners();

        let mut family = current.clone();
        patch.apply_to(&mut family);
        family.validate()?;

        if touches_partners {
            if let (Some(a), Some(b)) = (family.partner1, family.partner2) {
                if a == b {
                    return Err(Error::SelfUnion(a));
                }
            }
            if family.partner1 != old1 {
                if let Some(partner) = family.partner1 {
                    check_live_person(&*self, "partner1", partner)?;
                }
            }
            if family.partner2 != old2 {
                if let Some(partner) = family.partner2 {
                    check_live_person(&*self, "partner2", partner)?;
                }
            }
            let partners: Vec<PersonId> = family.partners().collect();
            check_acyclic(&*self, &partners, &stored_children(&*self, id))?;
        }

        family.updated_at = self.now;
        debug!(id = %id, "Updated family");
        self.put_family(family.clone());
        Ok(family)
    }

    /// Detach every child of the family, then move it to the trash
    pub fn delete_family(&mut self, id: FamilyId) -> Result<()> {
        let mut family = self.live_family(id)?.clone();

        let dependents: Vec<Person> = self
            .stored_persons()
            .filter(|p| p.parent_family == Some(id) || p.adoptive_family == Some(id))
            .cloned()
            .collect();
        let detached = dependents.len();
        for mut person in dependents {
            if person.parent_family == Some(id) {
                person.parent_family = None;
            }
            if person.adoptive_family == Some(id) {
                person.adoptive_family = None;
            }
            person.updated_at = self.now;
            self.put_person(person);
        }

        family.deleted_at = Some(self.now);
        debug!(id = %id, detached, "Moved family to trash");
        self.put_family(family);
        Ok(())
    }

    // ---- events and documents ----

    pub fn create_event(&mut self, new: NewEvent) -> Result<Event> {
        let mut event = new.into_event(EventId(0), self.now);
        event.validate()?;
        check_live_person(&*self, "person", event.person)?;
        event.id = self.sequences.next_event();
        debug!(id = %event.id, person = %event.person, "Created event");
        self.changes.events.insert(event.id, event.clone());
        Ok(event)
    }

    pub fn delete_event(&mut self, id: EventId) -> Result<()> {
        let mut event = self
            .event(id)
            .filter(|e| !e.is_deleted())
            .cloned()
            .ok_or(Error::NotFound(EntityRef::Event(id)))?;
        event.deleted_at = Some(self.now);
        self.changes.events.insert(id, event);
        Ok(())
    }

    pub fn create_document(&mut self, new: NewDocument) -> Result<Document> {
        let mut document = new.into_document(DocumentId(0), self.now);
        document.validate()?;
        if let Some(person) = document.person {
            check_live_person(&*self, "person", person)?;
        }
        document.id = self.sequences.next_document();
        debug!(id = %document.id, "Created document");
        self.changes.documents.insert(document.id, document.clone());
        Ok(document)
    }

    pub fn delete_document(&mut self, id: DocumentId) -> Result<()> {
        let mut document = self
            .document(id)
            .filter(|d| !d.is_deleted())
            .cloned()
            .ok_or(Error::NotFound(EntityRef::Document(id)))?;
        document.deleted_at = Some(self.now);
        self.changes.documents.insert(id, document);
        Ok(())
    }

    // ---- trash ----

    fn deleted_at(&self, entity: EntityRef) -> Option<DateTime<Utc>> {
        match entity {
            EntityRef::Person(id) => self.person(id)?.deleted_at,
            EntityRef::Family(id) => self.family(id)?.deleted_at,
            EntityRef::Event(id) => self.event(id)?.deleted_at,
            EntityRef::Document(id) => self.document(id)?.deleted_at,
        }
    }

    /// Take a record out of the trash, leaving its attributes untouched.
    ///
    /// Children detached when a family was deleted stay detached.
    pub fn restore(&mut self, entity: EntityRef) -> Result<()> {
        if self.deleted_at(entity).is_none() {
            return Err(Error::NotFound(entity));
        }
        match entity {
            EntityRef::Person(id) => {
                let mut person = self.person(id).cloned().ok_or(Error::NotFound(entity))?;
                if let Some(family) = person.parent_family {
                    check_live_family(&*self, "parent_family", family)?;
                }
                if let Some(family) = person.adoptive_family {
                    check_live_family(&*self, "adoptive_family", family)?;
                }
                person.deleted_at = None;
                self.put_person(person);
            }
            EntityRef::Family(id) => {
                let mut family = self.family(id).cloned().ok_or(Error::NotFound(entity))?;
                check_family_partners(&*self, family.partner1, family.partner2)?;
                family.deleted_at = None;
                self.put_family(family);
            }
            EntityRef::Event(id) => {
                let mut event = self.event(id).cloned().ok_or(Error::NotFound(entity))?;
                check_live_person(&*self, "person", event.person)?;
                event.deleted_at = None;
                self.changes.events.insert(id, event);
            }
            EntityRef::Document(id) => {
                let mut document = self.document(id).cloned().ok_or(Error::NotFound(entity))?;
                if let Some(person) = document.person {
                    check_live_person(&*self, "person", person)?;
                }
                document.deleted_at = None;
                self.changes.documents.insert(id, document);
            }
        }
        debug!(entity = %entity, "Restored from trash");
        Ok(())
    }

    /// Physically remove a trashed record and clear every reference to it
    pub fn purge(&mut self, entity: EntityRef) -> Result<()> {
        match self.deleted_at(entity) {
            Some(_) => {}
            None if self.contains(entity) => {
                return Err(Error::Validation(format!(
                    "{} is not in the trash; delete it before purging",
                    entity
                )))
            }
            None => return Err(Error::NotFound(entity)),
        }

        match entity {
            EntityRef::Person(id) => self.purge_person(id),
            EntityRef::Family(id) => self.purge_family(id),
            EntityRef::Event(id) => self.forget(EntityRef::Event(id)),
            EntityRef::Document(id) => self.forget(EntityRef::Document(id)),
        }
        debug!(entity = %entity, "Purged");
        Ok(())
    }

    fn contains(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Person(id) => self.person(id).is_some(),
            EntityRef::Family(id) => self.family(id).is_some(),
            EntityRef::Event(id) => self.event(id).is_some(),
            EntityRef::Document(id) => self.document(id).is_some(),
        }
    }

    fn purge_person(&mut self, id: PersonId) {
        let families: Vec<Family> = self
            .families()
            .filter(|f| f.has_partner(id))
            .cloned()
            .collect();
        for mut family in families {
            if family.partner1 == Some(id) {
                family.partner1 = None;
            }
            if family.partner2 == Some(id) {
                family.partner2 = None;
            }
            family.updated_at = self.now;
            self.put_family(family);
        }

        let events: Vec<EventId> = self
            .events()
            .filter(|e| e.person == id)
            .map(|e| e.id)
            .collect();
        for event in events {
            self.forget(EntityRef::Event(event));
        }

        let documents: Vec<Document> = self
            .documents()
            .filter(|d| d.person == Some(id))
            .cloned()
            .collect();
        for mut document in documents {
            document.person = None;
            self.changes.documents.insert(document.id, document);
        }

        self.forget(EntityRef::Person(id));
    }

    fn purge_family(&mut self, id: FamilyId) {
        let dependents: Vec<Person> = self
            .stored_persons()
            .filter(|p| p.parent_family == Some(id) || p.adoptive_family == Some(id))
            .cloned()
            .collect();
        for mut person in dependents {
            if person.parent_family == Some(id) {
                person.parent_family = None;
            }
            if person.adoptive_family == Some(id) {
                person.adoptive_family = None;
            }
            person.updated_at = self.now;
            self.put_person(person);
        }
        self.forget(EntityRef::Family(id));
    }

    fn forget(&mut self, entity: EntityRef) {
        match entity {
            EntityRef::Person(id) => {
                self.changes.persons.remove(&id);
            }
            EntityRef::Family(id) => {
                self.changes.families.remove(&id);
            }
            EntityRef::Event(id) => {
                self.changes.events.remove(&id);
            }
            EntityRef::Document(id) => {
                self.changes.documents.remove(&id);
            }
        }
        self.changes.purged.insert(entity);
    }
}

impl TreeView for Transaction<'_> {
    fn stored_person(&self, id: PersonId) -> Option<&Person> {
        self.person(id)
    }

    fn stored_family(&self, id: FamilyId) -> Option<&Family> {
        self.family(id)
    }

    fn stored_persons(&self) -> Box<dyn Iterator<Item = &Person> + '_> {
        Box::new(
            self.base
                .persons
                .values()
                .filter(|p| {
                    !self.changes.persons.contains_key(&p.id)
                        && !self.is_purged(EntityRef::Person(p.id))
                })
                .chain(self.changes.persons.values()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::LifeDate;
    use crate::event::EventKind;
    use chrono::NaiveDate;

    fn apply(tree: &mut FamilyTree, f: impl FnOnce(&mut Transaction) -> Result<()>) -> Result<()> {
        let changes = {
            let mut tx = Transaction::begin(tree);
            f(&mut tx)?;
            tx.into_changes()
        };
        tree.apply(&changes);
        Ok(())
    }

    /// Alice(1) + Bob(2) in family 1 with child Carol(3)
    fn family_of_three() -> FamilyTree {
        let mut tree = FamilyTree::new();
        apply(&mut tree, |tx| {
            let alice = tx.create_person(NewPerson::new("Alice", "Smith"))?;
            let bob = tx.create_person(NewPerson::new("Bob", "Smith"))?;
            let family = tx.create_family(NewFamily::union(alice.id, bob.id))?;
            tx.create_person(NewPerson::new("Carol", "Smith").child_of(family.id))?;
            Ok(())
        })
        .unwrap();
        tree
    }

    #[test]
    fn test_ids_are_sequential_per_kind() {
        let tree = family_of_three();
        assert_eq!(
            tree.persons.keys().copied().collect::<Vec<_>>(),
            vec![PersonId(1), PersonId(2), PersonId(3)]
        );
        assert_eq!(tree.families.keys().next(), Some(&FamilyId(1)));
        assert_eq!(tree.sequences.person, 3);
        assert_eq!(tree.sequences.family, 1);
    }

    #[test]
    fn test_failed_operation_leaves_overlay_untouched() {
        let tree = family_of_three();
        let mut tx = Transaction::begin(&tree);
        let err = tx
            .create_person(NewPerson::new("Dave", "Smith").child_of(FamilyId(42)))
            .unwrap_err();
        assert!(matches!(err, Error::DanglingReference { field: "parent_family", .. }));
        assert!(tx.into_changes().is_empty());
    }

    #[test]
    fn test_self_union_rejected() {
        let tree = family_of_three();
        let mut tx = Transaction::begin(&tree);
        assert!(matches!(
            tx.create_family(NewFamily::union(PersonId(1), PersonId(1))),
            Err(Error::SelfUnion(_))
        ));
        assert!(matches!(
            tx.update_family(FamilyId(1), FamilyPatch::new().partner2(Some(PersonId(1)))),
            Err(Error::SelfUnion(_))
        ));
    }

    #[test]
    fn test_cycle_rejected_on_attach() {
        let mut tree = family_of_three();
        // Carol(3) heads family 2; making Alice(1) her child closes a loop
        apply(&mut tree, |tx| {
            tx.create_family(NewFamily::single_parent(PersonId(3)))?;
            Ok(())
        })
        .unwrap();
        let mut tx = Transaction::begin(&tree);
        let err = tx.attach_child(FamilyId(2), PersonId(1)).unwrap_err();
        assert!(matches!(err, Error::CycleDetected(_)));

        let err = tx
            .update_person(PersonId(1), PersonPatch::new().parent_family(Some(FamilyId(2))))
            .unwrap_err();
        assert_eq!(err.code(), "cycle_detected");
    }

    #[test]
    fn test_cycle_rejected_on_partner_change() {
        let tree = family_of_three();
        let mut tx = Transaction::begin(&tree);
        let err = tx
            .update_family(FamilyId(1), FamilyPatch::new().partner2(Some(PersonId(3))))
            .unwrap_err();
        assert!(matches!(err, Error::CycleDetected(_)));
    }

    #[test]
    fn test_delete_family_detaches_children() {
        let mut tree = family_of_three();
        apply(&mut tree, |tx| tx.delete_family(FamilyId(1))).unwrap();

        let carol = &tree.persons[&PersonId(3)];
        assert_eq!(carol.parent_family, None);
        assert!(!carol.is_deleted());
        assert!(tree.families[&FamilyId(1)].is_deleted());

        // Restoring the family does not re-attach Carol
        apply(&mut tree, |tx| tx.restore(EntityRef::Family(FamilyId(1)))).unwrap();
        assert!(!tree.families[&FamilyId(1)].is_deleted());
        assert_eq!(tree.persons[&PersonId(3)].parent_family, None);
    }

    #[test]
    fn test_soft_delete_and_restore_keeps_attributes() {
        let mut tree = family_of_three();
        apply(&mut tree, |tx| {
            tx.update_person(
                PersonId(2),
                PersonPatch::new().birth(Some(LifeDate::exact(
                    NaiveDate::from_ymd_opt(1920, 2, 2).unwrap(),
                ))),
            )?;
            Ok(())
        })
        .unwrap();
        let before = tree.persons[&PersonId(2)].clone();

        apply(&mut tree, |tx| tx.delete_person(PersonId(2))).unwrap();
        assert!(tree.persons[&PersonId(2)].is_deleted());
        assert!(matches!(
            Transaction::begin(&tree).delete_person(PersonId(2)),
            Err(Error::NotFound(_))
        ));

        apply(&mut tree, |tx| tx.restore(EntityRef::Person(PersonId(2)))).unwrap();
        assert_eq!(tree.persons[&PersonId(2)], before);

        // Restoring something that is not in the trash
        assert!(matches!(
            Transaction::begin(&tree).restore(EntityRef::Person(PersonId(2))),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_purge_person_clears_references() {
        let mut tree = family_of_three();
        apply(&mut tree, |tx| {
            tx.create_event(NewEvent::new(PersonId(2), EventKind::Military))?;
            tx.create_document(NewDocument::new("Portrait", "bob.jpg").about(PersonId(2)))?;
            Ok(())
        })
        .unwrap();

        // Live records cannot be purged
        assert!(matches!(
            Transaction::begin(&tree).purge(EntityRef::Person(PersonId(2))),
            Err(Error::Validation(_))
        ));

        apply(&mut tree, |tx| {
            tx.delete_person(PersonId(2))?;
            tx.purge(EntityRef::Person(PersonId(2)))
        })
        .unwrap();

        assert!(!tree.persons.contains_key(&PersonId(2)));
        assert_eq!(tree.families[&FamilyId(1)].partner2, None);
        assert!(tree.events.is_empty());
        assert_eq!(tree.documents[&DocumentId(1)].person, None);

        // Purged ids are never handed out again
        apply(&mut tree, |tx| {
            let person = tx.create_person(NewPerson::new("Dora", "Smith"))?;
            assert_eq!(person.id, PersonId(4));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_purge_family_clears_children() {
        let mut tree = family_of_three();
        apply(&mut tree, |tx| {
            tx.update_person(PersonId(3), PersonPatch::new().adoptive_family(Some(FamilyId(1))))?;
            tx.delete_family(FamilyId(1))?;
            tx.purge(EntityRef::Family(FamilyId(1)))
        })
        .unwrap();
        assert!(tree.families.is_empty());
        assert_eq!(tree.persons[&PersonId(3)].adoptive_family, None);
    }

    #[test]
    fn test_event_requires_live_person() {
        let tree = family_of_three();
        let mut tx = Transaction::begin(&tree);
        tx.delete_person(PersonId(3)).unwrap();
        assert!(matches!(
            tx.create_event(NewEvent::new(PersonId(3), EventKind::Burial)),
            Err(Error::DanglingReference { field: "person", .. })
        ));
    }
}
