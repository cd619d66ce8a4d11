//! Consistency rules checked before any mutation is written
//!
//! Parentage acyclicity is checked over every stored link, trashed
//! records included, so that restoring a record can never close a cycle.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{Error, Result};
use crate::family::Family;
use crate::ids::{FamilyId, PersonId};
use crate::person::Person;
use crate::tree::{EntityRef, FamilyTree};

/// Read access to stored records (trashed ones included)
pub trait TreeView {
    fn stored_person(&self, id: PersonId) -> Option<&Person>;
    fn stored_family(&self, id: FamilyId) -> Option<&Family>;
    fn stored_persons(&self) -> Box<dyn Iterator<Item = &Person> + '_>;
}

impl TreeView for FamilyTree {
    fn stored_person(&self, id: PersonId) -> Option<&Person> {
        self.persons.get(&id)
    }

    fn stored_family(&self, id: FamilyId) -> Option<&Family> {
        self.families.get(&id)
    }

    fn stored_persons(&self) -> Box<dyn Iterator<Item = &Person> + '_> {
        Box::new(self.persons.values())
    }
}

/// The partner slots must hold distinct, live persons
pub fn check_family_partners(
    view: &impl TreeView,
    partner1: Option<PersonId>,
    partner2: Option<PersonId>,
) -> Result<()> {
    if let (Some(a), Some(b)) = (partner1, partner2) {
        if a == b {
            return Err(Error::SelfUnion(a));
        }
    }
    for (field, partner) in [("partner1", partner1), ("partner2", partner2)] {
        if let Some(id) = partner {
            check_live_person(view, field, id)?;
        }
    }
    Ok(())
}

/// `field` must point at a live person
pub fn check_live_person(view: &impl TreeView, field: &'static str, id: PersonId) -> Result<()> {
    match view.stored_person(id) {
        Some(person) if !person.is_deleted() => Ok(()),
        _ => Err(Error::DanglingReference {
            field,
            target: EntityRef::Person(id),
        }),
    }
}

/// `field` must point at a live family
pub fn check_live_family(view: &impl TreeView, field: &'static str, id: FamilyId) -> Result<()> {
    match view.stored_family(id) {
        Some(family) if !family.is_deleted() => Ok(()),
        _ => Err(Error::DanglingReference {
            field,
            target: EntityRef::Family(id),
        }),
    }
}

/// Persons whose `parent_family` is `family`, trashed ones included
pub fn stored_children(view: &impl TreeView, family: FamilyId) -> Vec<PersonId> {
    let mut children: Vec<PersonId> = view
        .stored_persons()
        .filter(|p| p.parent_family == Some(family))
        .map(|p| p.id)
        .collect();
    children.sort();
    children
}

/// Reject a union whose `partners` descend from one of its `children`.
///
/// Walks up from the partners through `parent_family` links. Reaching one
/// of the children means that child would become their own ancestor; the
/// error carries the cycle from that child down to the partner and back.
pub fn check_acyclic(
    view: &impl TreeView,
    partners: &[PersonId],
    children: &[PersonId],
) -> Result<()> {
    if children.is_empty() || partners.is_empty() {
        return Ok(());
    }
    let children: HashSet<PersonId> = children.iter().copied().collect();

    // ancestor -> the descendant it was reached from
    let mut reached_from: HashMap<PersonId, Option<PersonId>> = HashMap::new();
    let mut queue: VecDeque<PersonId> = VecDeque::new();
    for &partner in partners {
        if reached_from.insert(partner, None).is_none() {
            queue.push_back(partner);
        }
    }

    while let Some(current) = queue.pop_front() {
        if children.contains(&current) {
            let mut path = vec![current];
            let mut cursor = reached_from.get(&current).copied().flatten();
            while let Some(id) = cursor {
                path.push(id);
                cursor = reached_from.get(&id).copied().flatten();
            }
            path.push(current);
            tracing::debug!(person = %current, "Rejected mutation that closes a parentage cycle");
            return Err(Error::CycleDetected(path));
        }
        for parent in stored_parents(view, current) {
            if let std::collections::hash_map::Entry::Vacant(slot) = reached_from.entry(parent) {
                slot.insert(Some(current));
                queue.push_back(parent);
            }
        }
    }
    Ok(())
}

/// Partners of a person's parent family, following stored links only
fn stored_parents(view: &impl TreeView, person: PersonId) -> Vec<PersonId> {
    view.stored_person(person)
        .and_then(|p| p.parent_family)
        .and_then(|family| view.stored_family(family))
        .map(|family| family.partners().collect())
        .unwrap_or_default()
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Open,
    Done,
}

/// Find any parentage cycle in the stored graph.
///
/// Returns the cycle as a child-to-ancestor path that starts and ends on
/// the same person.
pub fn find_cycle(view: &impl TreeView) -> Option<Vec<PersonId>> {
    let mut ids: Vec<PersonId> = view.stored_persons().map(|p| p.id).collect();
    ids.sort();

    let mut marks: HashMap<PersonId, Mark> = HashMap::new();
    for start in ids {
        if marks.contains_key(&start) {
            continue;
        }
        // (person, its parents, index of the next parent to visit)
        let mut stack: Vec<(PersonId, Vec<PersonId>, usize)> =
            vec![(start, stored_parents(view, start), 0)];
        let mut path = vec![start];
        marks.insert(start, Mark::Open);

        while let Some((node, parents, next)) = stack.last_mut() {
            if *next == parents.len() {
                marks.insert(*node, Mark::Done);
                stack.pop();
                path.pop();
                continue;
            }
            let parent = parents[*next];
            *next += 1;
            match marks.get(&parent) {
                Some(Mark::Open) => {
                    let from = path.iter().position(|id| *id == parent)?;
                    let mut cycle = path[from..].to_vec();
                    cycle.push(parent);
                    return Some(cycle);
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(parent, Mark::Open);
                    path.push(parent);
                    stack.push((parent, stored_parents(view, parent), 0));
                }
            }
        }
    }
    None
}

/// Full scan of stored state: any parentage cycle, a live person whose
/// family link points at a missing or trashed family, or a partner slot
/// naming a person that no longer exists
pub fn check_integrity(tree: &FamilyTree) -> Result<()> {
    if let Some(cycle) = find_cycle(tree) {
        return Err(Error::CycleDetected(cycle));
    }
    for person in tree.live_persons() {
        if let Some(family) = person.parent_family {
            check_live_family(tree, "parent_family", family)?;
        }
        if let Some(family) = person.adoptive_family {
            check_live_family(tree, "adoptive_family", family)?;
        }
    }
    for family in tree.live_families() {
        for (field, partner) in [("partner1", family.partner1), ("partner2", family.partner2)] {
            if let Some(id) = partner.filter(|id| !tree.persons.contains_key(id)) {
                return Err(Error::DanglingReference {
                    field,
                    target: EntityRef::Person(id),
                });
            }
        }
    }
    Ok(())
}
