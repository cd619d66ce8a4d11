//! Genealogy service trait definition

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{Document, NewDocument};
use crate::error::{Error, Result};
use crate::event::{Event, NewEvent};
use crate::family::{Family, FamilyPatch, NewFamily};
use crate::ids::{DocumentId, EventId, FamilyId, PersonId};
use crate::kinship::KinshipGraph;
use crate::person::{Gender, NewPerson, Person, PersonPatch};
use crate::rules;
use crate::traversal::{Generations, LineageReport, TraversalEngine};
use crate::tree::{EntityRef, FamilyTree, TrashEntry};

/// Every kinship relation of one person
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelativesReport {
    pub person: Person,
    pub parents: Vec<Person>,
    pub adoptive_parents: Vec<Person>,
    pub partners: Vec<Person>,
    pub siblings: Vec<Person>,
    pub half_siblings: Vec<Person>,
    /// In birth order
    pub children: Vec<Person>,
}

impl RelativesReport {
    pub fn build(graph: &KinshipGraph<'_>, id: PersonId) -> Result<Self> {
        let owned = |people: Vec<&Person>| people.into_iter().cloned().collect::<Vec<_>>();
        Ok(Self {
            person: graph.person(id)?.clone(),
            parents: owned(graph.parents_of(id)?),
            adoptive_parents: owned(graph.adoptive_parents_of(id)?),
            partners: owned(graph.partners_of(id)?),
            siblings: owned(graph.siblings_of(id)?),
            half_siblings: owned(graph.half_siblings_of(id)?),
            children: owned(graph.children_in_birth_order(id)?),
        })
    }
}

/// Summary counts over live records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeStats {
    pub persons: usize,
    pub living: usize,
    pub deceased: usize,
    pub male: usize,
    pub female: usize,
    pub unknown_gender: usize,
    pub families: usize,
    pub events: usize,
    pub documents: usize,
    pub trashed: usize,
    /// Generation rows of the largest connected tree
    pub generations: u32,
}

impl TreeStats {
    pub fn compute(tree: &FamilyTree) -> Result<Self> {
        let mut stats = Self::default();
        for person in tree.live_persons() {
            stats.persons += 1;
            if person.is_alive() {
                stats.living += 1;
            } else {
                stats.deceased += 1;
            }
            match person.gender {
                Gender::Male => stats.male += 1,
                Gender::Female => stats.female += 1,
                Gender::Unknown => stats.unknown_gender += 1,
            }
        }
        stats.families = tree.live_families().count();
        stats.events = tree.live_events().count();
        stats.documents = tree.live_documents().count();
        stats.trashed = tree.trash().len();

        // Lay out every tree once, starting from persons without parents
        let graph = KinshipGraph::new(tree);
        let mut covered = std::collections::HashSet::new();
        let mut largest: Option<Generations> = None;
        for person in tree.live_persons() {
            if covered.contains(&person.id) || !graph.parent_ids(person.id)?.is_empty() {
                continue;
            }
            let layering = TraversalEngine::assign_generations(&graph, person.id)?;
            covered.extend(layering.order.iter().map(|(id, _)| *id));
            if largest.as_ref().map_or(true, |best| layering.len() > best.len()) {
                largest = Some(layering);
            }
        }
        stats.generations = largest.map_or(0, |g| g.depth() + 1);
        Ok(stats)
    }
}

/// Main trait for family tree operations
///
/// Reads have default implementations over [`Genealogy::snapshot`], so a
/// store only supplies mutations and a consistent snapshot.
#[async_trait]
pub trait Genealogy: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Person Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn create_person(&self, person: NewPerson) -> Result<Person>;

    async fn update_person(&self, id: PersonId, patch: PersonPatch) -> Result<Person>;

    /// Move a person to the trash
    async fn delete_person(&self, id: PersonId) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Family Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn create_family(&self, family: NewFamily) -> Result<Family>;

    async fn update_family(&self, id: FamilyId, patch: FamilyPatch) -> Result<Family>;

    /// Detach the family's children, then move it to the trash
    async fn delete_family(&self, id: FamilyId) -> Result<()>;

    async fn attach_child(&self, family: FamilyId, child: PersonId) -> Result<Person>;

    async fn detach_child(&self, child: PersonId) -> Result<Person>;

    // ─────────────────────────────────────────────────────────────────────────
    // Event and Document Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn create_event(&self, event: NewEvent) -> Result<Event>;

    async fn delete_event(&self, id: EventId) -> Result<()>;

    async fn create_document(&self, document: NewDocument) -> Result<Document>;

    async fn delete_document(&self, id: DocumentId) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Trash Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn restore(&self, entity: EntityRef) -> Result<()>;

    /// Permanently remove a trashed record
    async fn purge(&self, entity: EntityRef) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Complete committed state, trashed records included
    async fn snapshot(&self) -> Result<FamilyTree>;

    async fn person(&self, id: PersonId) -> Result<Person> {
        let tree = self.snapshot().await?;
        tree.live_person(id)
            .cloned()
            .ok_or(Error::NotFound(EntityRef::Person(id)))
    }

    async fn family(&self, id: FamilyId) -> Result<Family> {
        let tree = self.snapshot().await?;
        tree.live_family(id)
            .cloned()
            .ok_or(Error::NotFound(EntityRef::Family(id)))
    }

    /// Live persons in id order
    async fn persons(&self) -> Result<Vec<Person>> {
        let tree = self.snapshot().await?;
        Ok(tree.live_persons().cloned().collect())
    }

    async fn families(&self) -> Result<Vec<Family>> {
        let tree = self.snapshot().await?;
        Ok(tree.live_families().cloned().collect())
    }

    async fn events_for(&self, person: PersonId) -> Result<Vec<Event>> {
        let tree = self.snapshot().await?;
        KinshipGraph::new(&tree).person(person)?;
        Ok(tree.events_for(person).into_iter().cloned().collect())
    }

    async fn documents_for(&self, person: PersonId) -> Result<Vec<Document>> {
        let tree = self.snapshot().await?;
        KinshipGraph::new(&tree).person(person)?;
        Ok(tree.documents_for(person).into_iter().cloned().collect())
    }

    async fn trash(&self) -> Result<Vec<TrashEntry>> {
        Ok(self.snapshot().await?.trash())
    }

    async fn parents_of(&self, id: PersonId) -> Result<Vec<Person>> {
        let tree = self.snapshot().await?;
        let graph = KinshipGraph::new(&tree);
        Ok(graph.parents_of(id)?.into_iter().cloned().collect())
    }

    async fn children_of(&self, id: PersonId) -> Result<Vec<Person>> {
        let tree = self.snapshot().await?;
        let graph = KinshipGraph::new(&tree);
        Ok(graph.children_of(id)?.into_iter().cloned().collect())
    }

    async fn partners_of(&self, id: PersonId) -> Result<Vec<Person>> {
        let tree = self.snapshot().await?;
        let graph = KinshipGraph::new(&tree);
        Ok(graph.partners_of(id)?.into_iter().cloned().collect())
    }

    async fn siblings_of(&self, id: PersonId) -> Result<Vec<Person>> {
        let tree = self.snapshot().await?;
        let graph = KinshipGraph::new(&tree);
        Ok(graph.siblings_of(id)?.into_iter().cloned().collect())
    }

    async fn half_siblings_of(&self, id: PersonId) -> Result<Vec<Person>> {
        let tree = self.snapshot().await?;
        let graph = KinshipGraph::new(&tree);
        Ok(graph.half_siblings_of(id)?.into_iter().cloned().collect())
    }

    async fn adoptive_parents_of(&self, id: PersonId) -> Result<Vec<Person>> {
        let tree = self.snapshot().await?;
        let graph = KinshipGraph::new(&tree);
        Ok(graph.adoptive_parents_of(id)?.into_iter().cloned().collect())
    }

    async fn relatives(&self, id: PersonId) -> Result<RelativesReport> {
        let tree = self.snapshot().await?;
        RelativesReport::build(&KinshipGraph::new(&tree), id)
    }

    async fn ancestors_of(&self, id: PersonId, max_depth: u32) -> Result<LineageReport> {
        let tree = self.snapshot().await?;
        TraversalEngine::ancestors(&KinshipGraph::new(&tree), id, max_depth)
    }

    async fn descendants_of(&self, id: PersonId, max_depth: u32) -> Result<LineageReport> {
        let tree = self.snapshot().await?;
        TraversalEngine::descendants(&KinshipGraph::new(&tree), id, max_depth)
    }

    async fn find_root(&self, id: PersonId) -> Result<Person> {
        let tree = self.snapshot().await?;
        let graph = KinshipGraph::new(&tree);
        TraversalEngine::find_root(&graph, id).cloned()
    }

    async fn assign_generations(&self, root: PersonId) -> Result<Generations> {
        let tree = self.snapshot().await?;
        TraversalEngine::assign_generations(&KinshipGraph::new(&tree), root)
    }

    async fn stats(&self) -> Result<TreeStats> {
        TreeStats::compute(&self.snapshot().await?)
    }

    /// Scan the whole tree for cycles and dangling links
    async fn check_integrity(&self) -> Result<()> {
        rules::check_integrity(&self.snapshot().await?)
    }
}
