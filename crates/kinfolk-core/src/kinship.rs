//! Read-only kinship projection over live records
//!
//! Built from one snapshot of the tree and discarded afterwards, so every
//! answer reflects the latest committed state. Trashed persons and families
//! are invisible here.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::family::Family;
use crate::ids::{FamilyId, PersonId};
use crate::person::Person;
use crate::tree::{EntityRef, FamilyTree};

pub struct KinshipGraph<'a> {
    tree: &'a FamilyTree,
    /// Live children per live family, ascending by id
    children_by_family: HashMap<FamilyId, Vec<PersonId>>,
    /// Live adoptees per live family, ascending by id
    adopted_by_family: HashMap<FamilyId, Vec<PersonId>>,
    /// Live families per partner, ascending by id
    families_by_partner: HashMap<PersonId, Vec<FamilyId>>,
}

impl<'a> KinshipGraph<'a> {
    pub fn new(tree: &'a FamilyTree) -> Self {
        let mut children_by_family: HashMap<FamilyId, Vec<PersonId>> = HashMap::new();
        let mut adopted_by_family: HashMap<FamilyId, Vec<PersonId>> = HashMap::new();
        let mut families_by_partner: HashMap<PersonId, Vec<FamilyId>> = HashMap::new();

        for person in tree.live_persons() {
            if let Some(family) = person.parent_family.filter(|f| tree.live_family(*f).is_some()) {
                children_by_family.entry(family).or_default().push(person.id);
            }
            if let Some(family) = person
                .adoptive_family
                .filter(|f| tree.live_family(*f).is_some())
            {
                adopted_by_family.entry(family).or_default().push(person.id);
            }
        }
        for family in tree.live_families() {
            for partner in family.partners() {
                if tree.live_person(partner).is_some() {
                    let families = families_by_partner.entry(partner).or_default();
                    // a family lists a partner once even if both slots somehow match
                    if families.last() != Some(&family.id) {
                        families.push(family.id);
                    }
                }
            }
        }

        Self {
            tree,
            children_by_family,
            adopted_by_family,
            families_by_partner,
        }
    }

    pub fn tree(&self) -> &'a FamilyTree {
        self.tree
    }

    /// A live person, or `NotFound`
    pub fn person(&self, id: PersonId) -> Result<&'a Person> {
        self.tree
            .live_person(id)
            .ok_or(Error::NotFound(EntityRef::Person(id)))
    }

    pub fn family(&self, id: FamilyId) -> Result<&'a Family> {
        self.tree
            .live_family(id)
            .ok_or(Error::NotFound(EntityRef::Family(id)))
    }

    fn resolve(&self, ids: Vec<PersonId>) -> Vec<&'a Person> {
        ids.into_iter()
            .filter_map(|id| self.tree.live_person(id))
            .collect()
    }

    fn live_partners(&self, family: FamilyId) -> Vec<PersonId> {
        self.tree
            .live_family(family)
            .map(|f| {
                f.partners()
                    .filter(|p| self.tree.live_person(*p).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parent ids in partner-slot order (`partner1` first)
    pub fn parent_ids(&self, id: PersonId) -> Result<Vec<PersonId>> {
        let person = self.person(id)?;
        Ok(person
            .parent_family
            .map(|family| self.live_partners(family))
            .unwrap_or_default())
    }

    /// Children across all of a person's families, de-duplicated, in family
    /// id order then child id order
    pub fn child_ids(&self, id: PersonId) -> Result<Vec<PersonId>> {
        self.person(id)?;
        let mut seen = HashSet::new();
        let mut children = Vec::new();
        for family in self.partner_family_ids(id) {
            for child in self.family_child_ids(*family) {
                if seen.insert(*child) {
                    children.push(*child);
                }
            }
        }
        Ok(children)
    }

    /// The other partner in each of a person's families
    pub fn partner_ids(&self, id: PersonId) -> Result<Vec<PersonId>> {
        self.person(id)?;
        Ok(self
            .partner_family_ids(id)
            .iter()
            .filter_map(|family| self.tree.live_family(*family)?.other_partner(id))
            .filter(|partner| self.tree.live_person(*partner).is_some())
            .collect())
    }

    fn partner_family_ids(&self, id: PersonId) -> &[FamilyId] {
        self.families_by_partner
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn family_child_ids(&self, family: FamilyId) -> &[PersonId] {
        self.children_by_family
            .get(&family)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn parents_of(&self, id: PersonId) -> Result<Vec<&'a Person>> {
        Ok(self.resolve(self.parent_ids(id)?))
    }

    pub fn children_of(&self, id: PersonId) -> Result<Vec<&'a Person>> {
        Ok(self.resolve(self.child_ids(id)?))
    }

    /// Children sorted by birth order, then birth date; unknowns last
    pub fn children_in_birth_order(&self, id: PersonId) -> Result<Vec<&'a Person>> {
        let mut children = self.children_of(id)?;
        children.sort_by_key(|c| {
            (
                c.birth_order.is_none(),
                c.birth_order,
                c.birth.is_none(),
                c.birth.map(|b| b.date),
            )
        });
        Ok(children)
    }

    pub fn partners_of(&self, id: PersonId) -> Result<Vec<&'a Person>> {
        Ok(self.resolve(self.partner_ids(id)?))
    }

    /// Other children of the same parent family
    pub fn siblings_of(&self, id: PersonId) -> Result<Vec<&'a Person>> {
        let person = self.person(id)?;
        let siblings = match person.parent_family {
            Some(family) => self
                .family_child_ids(family)
                .iter()
                .copied()
                .filter(|child| *child != id)
                .collect(),
            None => Vec::new(),
        };
        Ok(self.resolve(siblings))
    }

    /// Children of either parent through any other family, full siblings
    /// excluded. Adoptive families play no part.
    pub fn half_siblings_of(&self, id: PersonId) -> Result<Vec<&'a Person>> {
        let person = self.person(id)?;
        let Some(own_family) = person.parent_family else {
            return Ok(Vec::new());
        };

        let mut seen = HashSet::new();
        let mut half = Vec::new();
        for parent in self.parent_ids(id)? {
            for child in self.child_ids(parent)? {
                let full_sibling = self
                    .tree
                    .live_person(child)
                    .is_some_and(|c| c.parent_family == Some(own_family));
                if child != id && !full_sibling && seen.insert(child) {
                    half.push(child);
                }
            }
        }
        Ok(self.resolve(half))
    }

    /// Partners of a person's adoptive family
    pub fn adoptive_parents_of(&self, id: PersonId) -> Result<Vec<&'a Person>> {
        let person = self.person(id)?;
        let parents = person
            .adoptive_family
            .map(|family| self.live_partners(family))
            .unwrap_or_default();
        Ok(self.resolve(parents))
    }

    /// Persons adopted into a family
    pub fn adoptees_of(&self, family: FamilyId) -> Result<Vec<&'a Person>> {
        self.family(family)?;
        let adopted = self
            .adopted_by_family
            .get(&family)
            .cloned()
            .unwrap_or_default();
        Ok(self.resolve(adopted))
    }

    /// Children of one family
    pub fn children_of_family(&self, family: FamilyId) -> Result<Vec<&'a Person>> {
        self.family(family)?;
        Ok(self.resolve(self.family_child_ids(family).to_vec()))
    }

    /// Families in which the person is a partner
    pub fn families_of(&self, id: PersonId) -> Result<Vec<&'a Family>> {
        self.person(id)?;
        Ok(self
            .partner_family_ids(id)
            .iter()
            .filter_map(|family| self.tree.live_family(*family))
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::date::LifeDate;
    use crate::family::NewFamily;
    use crate::person::NewPerson;
    use chrono::{NaiveDate, Utc};

    pub(crate) struct Builder {
        pub tree: FamilyTree,
    }

    impl Builder {
        pub fn new() -> Self {
            Self {
                tree: FamilyTree::new(),
            }
        }

        pub fn person(&mut self, first: &str) -> PersonId {
            let id = self.tree.sequences.next_person();
            let person = NewPerson::new(first, "Test").into_person(id, Utc::now());
            self.tree.persons.insert(id, person);
            id
        }

        pub fn family(&mut self, p1: Option<PersonId>, p2: Option<PersonId>) -> FamilyId {
            let id = self.tree.sequences.next_family();
            let mut new = NewFamily::unknown_parents();
            new.partner1 = p1;
            new.partner2 = p2;
            self.tree.families.insert(id, new.into_family(id, Utc::now()));
            id
        }

        pub fn child(&mut self, first: &str, family: FamilyId) -> PersonId {
            let id = self.person(first);
            self.tree.persons.get_mut(&id).unwrap().parent_family = Some(family);
            id
        }
    }

    fn names(people: Vec<&Person>) -> Vec<String> {
        people.into_iter().map(|p| p.name.first.clone()).collect()
    }

    #[test]
    fn test_alice_bob_carol_dave() {
        let mut b = Builder::new();
        let alice = b.person("Alice");
        let bob = b.person("Bob");
        let f1 = b.family(Some(alice), Some(bob));
        let carol = b.child("Carol", f1);

        let graph = KinshipGraph::new(&b.tree);
        assert_eq!(names(graph.parents_of(carol).unwrap()), vec!["Alice", "Bob"]);
        assert_eq!(names(graph.children_of(alice).unwrap()), vec!["Carol"]);
        assert!(graph.siblings_of(carol).unwrap().is_empty());
        assert_eq!(names(graph.partners_of(bob).unwrap()), vec!["Alice"]);

        let dave = b.child("Dave", f1);
        let graph = KinshipGraph::new(&b.tree);
        assert_eq!(names(graph.siblings_of(carol).unwrap()), vec!["Dave"]);
        assert_eq!(names(graph.siblings_of(dave).unwrap()), vec!["Carol"]);
    }

    #[test]
    fn test_parent_child_round_trip() {
        let mut b = Builder::new();
        let alice = b.person("Alice");
        let f1 = b.family(None, Some(alice));
        let carol = b.child("Carol", f1);

        let graph = KinshipGraph::new(&b.tree);
        let parents = graph.parents_of(carol).unwrap();
        assert_eq!(parents.len(), 1);
        let children = graph.children_of(parents[0].id).unwrap();
        assert!(children.iter().any(|c| c.id == carol));
    }

    #[test]
    fn test_half_siblings() {
        let mut b = Builder::new();
        let alice = b.person("Alice");
        let bob = b.person("Bob");
        let cleo = b.person("Cleo");
        let first = b.family(Some(alice), Some(bob));
        let second = b.family(Some(alice), Some(cleo));
        let carol = b.child("Carol", first);
        let dave = b.child("Dave", first);
        let erin = b.child("Erin", second);

        let graph = KinshipGraph::new(&b.tree);
        assert_eq!(names(graph.half_siblings_of(carol).unwrap()), vec!["Erin"]);
        assert_eq!(
            names(graph.half_siblings_of(erin).unwrap()),
            vec!["Carol", "Dave"]
        );
        assert_eq!(names(graph.siblings_of(dave).unwrap()), vec!["Carol"]);
        assert_eq!(
            names(graph.children_of(alice).unwrap()),
            vec!["Carol", "Dave", "Erin"]
        );
        assert_eq!(names(graph.partners_of(alice).unwrap()), vec!["Bob", "Cleo"]);
    }

    #[test]
    fn test_adoption_does_not_make_half_siblings() {
        let mut b = Builder::new();
        let alice = b.person("Alice");
        let bob = b.person("Bob");
        let birth = b.family(Some(alice), None);
        let adoptive = b.family(Some(bob), None);
        let carol = b.child("Carol", birth);
        let dave = b.child("Dave", adoptive);
        b.tree.persons.get_mut(&carol).unwrap().adoptive_family = Some(adoptive);

        let graph = KinshipGraph::new(&b.tree);
        assert!(graph.half_siblings_of(carol).unwrap().is_empty());
        assert!(graph.half_siblings_of(dave).unwrap().is_empty());
        assert_eq!(names(graph.adoptive_parents_of(carol).unwrap()), vec!["Bob"]);
        assert_eq!(names(graph.adoptees_of(adoptive).unwrap()), vec!["Carol"]);
    }

    #[test]
    fn test_trashed_records_are_invisible() {
        let mut b = Builder::new();
        let alice = b.person("Alice");
        let bob = b.person("Bob");
        let f1 = b.family(Some(alice), Some(bob));
        let carol = b.child("Carol", f1);
        b.tree.persons.get_mut(&bob).unwrap().deleted_at = Some(Utc::now());

        let graph = KinshipGraph::new(&b.tree);
        assert_eq!(names(graph.parents_of(carol).unwrap()), vec!["Alice"]);
        assert!(graph.partners_of(alice).unwrap().is_empty());
        assert!(matches!(
            graph.parents_of(bob),
            Err(Error::NotFound(EntityRef::Person(_)))
        ));
        assert!(graph.children_of(PersonId(99)).is_err());

        b.tree.families.get_mut(&f1).unwrap().deleted_at = Some(Utc::now());
        let graph = KinshipGraph::new(&b.tree);
        assert!(graph.parents_of(carol).unwrap().is_empty());
        assert!(graph.children_of(alice).unwrap().is_empty());
    }

    #[test]
    fn test_children_in_birth_order() {
        let mut b = Builder::new();
        let alice = b.person("Alice");
        let f1 = b.family(Some(alice), None);
        let first = b.child("Late", f1);
        let second = b.child("Early", f1);
        b.child("Unknown", f1);
        b.tree.persons.get_mut(&first).unwrap().birth =
            Some(LifeDate::exact(NaiveDate::from_ymd_opt(1960, 1, 1).unwrap()));
        b.tree.persons.get_mut(&second).unwrap().birth =
            Some(LifeDate::exact(NaiveDate::from_ymd_opt(1955, 1, 1).unwrap()));

        let graph = KinshipGraph::new(&b.tree);
        assert_eq!(
            names(graph.children_of(alice).unwrap()),
            vec!["Late", "Early", "Unknown"]
        );
        assert_eq!(
            names(graph.children_in_birth_order(alice).unwrap()),
            vec!["Early", "Late", "Unknown"]
        );
    }
}
