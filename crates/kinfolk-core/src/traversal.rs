//! Lineage walks, root finding and generation layering

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ids::PersonId;
use crate::kinship::KinshipGraph;
use crate::limits::{validate_traversal_depth, DEFAULT_TRAVERSAL_DEPTH, MAX_TRAVERSAL_NODES};
use crate::person::Person;

/// Direction of a lineage walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lineage {
    Ancestors,
    Descendants,
}

/// Lineage query builder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageQuery {
    /// Person the walk starts from (depth 0)
    pub start: PersonId,

    pub lineage: Lineage,

    /// Deepest level included in the result
    #[serde(default = "default_depth")]
    pub max_depth: u32,
}

fn default_depth() -> u32 {
    DEFAULT_TRAVERSAL_DEPTH
}

impl LineageQuery {
    pub fn ancestors(start: PersonId) -> Self {
        Self {
            start,
            lineage: Lineage::Ancestors,
            max_depth: default_depth(),
        }
    }

    pub fn descendants(start: PersonId) -> Self {
        Self {
            start,
            lineage: Lineage::Descendants,
            max_depth: default_depth(),
        }
    }

    /// Set maximum traversal depth
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }
}

/// One person on a lineage path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageEntry {
    pub person: Person,
    pub depth: u32,
}

/// Traversal statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraversalStats {
    pub nodes_visited: usize,
    pub max_depth_reached: u32,
    /// The walk hit the node cap and stopped early
    pub truncated: bool,
}

/// Result of a lineage walk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageReport {
    pub start: PersonId,
    pub lineage: Lineage,
    /// Depth-first order; a person reachable along several paths appears once per path
    pub entries: Vec<LineageEntry>,
    pub stats: TraversalStats,
}

/// Generation number per person, relative to a root at generation 0
#[derive(Debug, Clone, Serialize)]
pub struct Generations {
    pub root: PersonId,
    /// (person, generation) in the order the layering reached them
    pub order: Vec<(PersonId, u32)>,
    #[serde(skip)]
    index: HashMap<PersonId, u32>,
}

impl Generations {
    pub fn get(&self, person: PersonId) -> Option<u32> {
        self.index.get(&person).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Highest generation number reached
    pub fn depth(&self) -> u32 {
        self.order.iter().map(|(_, g)| *g).max().unwrap_or(0)
    }

    /// Persons grouped by generation, each row in visiting order
    pub fn rows(&self) -> Vec<Vec<PersonId>> {
        let mut rows: Vec<Vec<PersonId>> = vec![Vec::new(); self.depth() as usize + 1];
        for (person, generation) in &self.order {
            rows[*generation as usize].push(*person);
        }
        rows
    }
}

/// Kinship traversal engine
pub struct TraversalEngine;

impl TraversalEngine {
    /// Walk ancestors or descendants depth-first.
    ///
    /// Depth 0 is the start person. Levels up to and including `max_depth`
    /// are reported. Branches are not de-duplicated, so pedigree collapse
    /// shows the shared ancestor once per path.
    pub fn lineage(graph: &KinshipGraph<'_>, query: &LineageQuery) -> Result<LineageReport> {
        validate_traversal_depth(query.max_depth)?;
        graph.person(query.start)?;

        tracing::debug!(
            "Executing lineage walk: start={}, lineage={:?}, depth={}",
            query.start,
            query.lineage,
            query.max_depth
        );

        let mut entries = Vec::new();
        let mut stats = TraversalStats::default();
        let mut stack: Vec<(PersonId, u32)> = vec![(query.start, 0)];

        while let Some((current, depth)) = stack.pop() {
            if entries.len() >= MAX_TRAVERSAL_NODES {
                stats.truncated = true;
                tracing::warn!(
                    "Lineage walk from {} truncated at {} entries",
                    query.start,
                    MAX_TRAVERSAL_NODES
                );
                break;
            }

            let person = graph.person(current)?;
            stats.nodes_visited += 1;
            stats.max_depth_reached = stats.max_depth_reached.max(depth);
            entries.push(LineageEntry {
                person: person.clone(),
                depth,
            });

            if depth >= query.max_depth {
                continue;
            }
            let next = match query.lineage {
                Lineage::Ancestors => graph.parent_ids(current)?,
                Lineage::Descendants => graph.child_ids(current)?,
            };
            // Reversed so the first parent/child is explored first
            for id in next.into_iter().rev() {
                stack.push((id, depth + 1));
            }
        }

        Ok(LineageReport {
            start: query.start,
            lineage: query.lineage,
            entries,
            stats,
        })
    }

    pub fn ancestors(
        graph: &KinshipGraph<'_>,
        start: PersonId,
        max_depth: u32,
    ) -> Result<LineageReport> {
        Self::lineage(graph, &LineageQuery::ancestors(start).with_depth(max_depth))
    }

    pub fn descendants(
        graph: &KinshipGraph<'_>,
        start: PersonId,
        max_depth: u32,
    ) -> Result<LineageReport> {
        Self::lineage(graph, &LineageQuery::descendants(start).with_depth(max_depth))
    }

    /// Follow the first parent until reaching a person without parents.
    ///
    /// On cyclic data the first person seen twice is returned.
    pub fn find_root<'a>(graph: &KinshipGraph<'a>, start: PersonId) -> Result<&'a Person> {
        let mut visited = HashSet::new();
        let mut current = start;
        loop {
            if !visited.insert(current) {
                tracing::warn!("Parentage cycle at person {} while finding root", current);
                return graph.person(current);
            }
            match graph.parent_ids(current)?.first() {
                Some(parent) => current = *parent,
                None => return graph.person(current),
            }
        }
    }

    /// Breadth-first generation layering from `root`.
    ///
    /// Partners share the generation of the person they are reached from,
    /// children get one more. The first assignment of a person wins.
    pub fn assign_generations(graph: &KinshipGraph<'_>, root: PersonId) -> Result<Generations> {
        graph.person(root)?;

        let mut index = HashMap::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        index.insert(root, 0);
        queue.push_back((root, 0u32));

        while let Some((current, generation)) = queue.pop_front() {
            order.push((current, generation));
            for partner in graph.partner_ids(current)? {
                if let std::collections::hash_map::Entry::Vacant(slot) = index.entry(partner) {
                    slot.insert(generation);
                    queue.push_back((partner, generation));
                }
            }
            for child in graph.child_ids(current)? {
                if let std::collections::hash_map::Entry::Vacant(slot) = index.entry(child) {
                    slot.insert(generation + 1);
                    queue.push_back((child, generation + 1));
                }
            }
        }

        tracing::debug!("Assigned generations to {} persons from {}", order.len(), root);
        Ok(Generations { root, order, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::kinship::tests::Builder;

    fn depths(report: &LineageReport) -> Vec<(String, u32)> {
        report
            .entries
            .iter()
            .map(|e| (e.person.name.first.clone(), e.depth))
            .collect()
    }

    /// Grandparents G1+G2 -> Alice; Alice + Bob -> Carol; Carol -> Dora
    fn four_generations() -> (Builder, [PersonId; 6]) {
        let mut b = Builder::new();
        let g1 = b.person("Gus");
        let g2 = b.person("Greta");
        let gf = b.family(Some(g1), Some(g2));
        let alice = b.child("Alice", gf);
        let bob = b.person("Bob");
        let f1 = b.family(Some(alice), Some(bob));
        let carol = b.child("Carol", f1);
        let f2 = b.family(Some(carol), None);
        let dora = b.child("Dora", f2);
        (b, [g1, g2, alice, bob, carol, dora])
    }

    #[test]
    fn test_ancestors_depth_first() {
        let (b, [_, _, _, _, _, dora]) = four_generations();
        let graph = KinshipGraph::new(&b.tree);
        let report = TraversalEngine::ancestors(&graph, dora, 10).unwrap();
        assert_eq!(
            depths(&report),
            vec![
                ("Dora".to_string(), 0),
                ("Carol".to_string(), 1),
                ("Alice".to_string(), 2),
                ("Gus".to_string(), 3),
                ("Greta".to_string(), 3),
                ("Bob".to_string(), 2),
            ]
        );
        assert_eq!(report.stats.max_depth_reached, 3);
        assert!(!report.stats.truncated);
    }

    #[test]
    fn test_max_depth_is_inclusive() {
        let (b, [_, _, _, _, _, dora]) = four_generations();
        let graph = KinshipGraph::new(&b.tree);
        let report = TraversalEngine::ancestors(&graph, dora, 2).unwrap();
        assert_eq!(report.entries.len(), 4);
        assert!(report.entries.iter().all(|e| e.depth <= 2));

        let only_self = TraversalEngine::ancestors(&graph, dora, 0).unwrap();
        assert_eq!(only_self.entries.len(), 1);

        assert!(matches!(
            TraversalEngine::ancestors(&graph, dora, 51),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_descendants() {
        let (b, [g1, ..]) = four_generations();
        let graph = KinshipGraph::new(&b.tree);
        let report = TraversalEngine::descendants(&graph, g1, 10).unwrap();
        assert_eq!(
            depths(&report),
            vec![
                ("Gus".to_string(), 0),
                ("Alice".to_string(), 1),
                ("Carol".to_string(), 2),
                ("Dora".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_pedigree_collapse_is_not_deduplicated() {
        // Cousins Carl and Cora share grandparents Gus + Greta, and have a child
        let mut b = Builder::new();
        let gus = b.person("Gus");
        let greta = b.person("Greta");
        let gf = b.family(Some(gus), Some(greta));
        let ann = b.child("Ann", gf);
        let ben = b.child("Ben", gf);
        let fa = b.family(Some(ann), None);
        let fb = b.family(Some(ben), None);
        let carl = b.child("Carl", fa);
        let cora = b.child("Cora", fb);
        let fc = b.family(Some(carl), Some(cora));
        let kid = b.child("Kid", fc);

        let graph = KinshipGraph::new(&b.tree);
        let report = TraversalEngine::ancestors(&graph, kid, 10).unwrap();
        let gus_entries: Vec<u32> = report
            .entries
            .iter()
            .filter(|e| e.person.id == gus)
            .map(|e| e.depth)
            .collect();
        assert_eq!(gus_entries, vec![3, 3]);
        assert!(report.entries.iter().filter(|e| e.person.id == kid).all(|e| e.depth == 0));
    }

    #[test]
    fn test_find_root_prefers_partner1() {
        let (b, [g1, _, alice, _, _, dora]) = four_generations();
        let graph = KinshipGraph::new(&b.tree);
        assert_eq!(TraversalEngine::find_root(&graph, dora).unwrap().id, g1);
        assert_eq!(TraversalEngine::find_root(&graph, g1).unwrap().id, g1);
        assert_eq!(
            graph.parents_of(alice).unwrap()[0].id,
            g1,
            "partner1 is the first parent"
        );
    }

    #[test]
    fn test_cyclic_data_terminates() {
        let mut b = Builder::new();
        let a = b.person("A");
        let c = b.person("C");
        let fa = b.family(Some(a), None);
        let fc = b.family(Some(c), None);
        // a is c's child and c is a's child: only reachable through raw writes
        b.tree.persons.get_mut(&c).unwrap().parent_family = Some(fa);
        b.tree.persons.get_mut(&a).unwrap().parent_family = Some(fc);

        let graph = KinshipGraph::new(&b.tree);
        let root = TraversalEngine::find_root(&graph, a).unwrap();
        assert_eq!(root.id, a);

        let generations = TraversalEngine::assign_generations(&graph, a).unwrap();
        assert_eq!(generations.len(), 2);
        assert_eq!(generations.get(a), Some(0));
        assert_eq!(generations.get(c), Some(1));

        let report = TraversalEngine::ancestors(&graph, a, 10).unwrap();
        assert_eq!(report.entries.len(), 11);
        assert_eq!(report.stats.max_depth_reached, 10);
    }

    #[test]
    fn test_assign_generations() {
        let (mut b, [g1, g2, alice, bob, carol, dora]) = four_generations();
        let eve = b.person("Eve");
        b.family(Some(carol), Some(eve));

        let graph = KinshipGraph::new(&b.tree);
        let generations = TraversalEngine::assign_generations(&graph, g1).unwrap();
        assert_eq!(generations.get(g1), Some(0));
        assert_eq!(generations.get(g2), Some(0));
        assert_eq!(generations.get(alice), Some(1));
        assert_eq!(generations.get(bob), Some(1));
        assert_eq!(generations.get(carol), Some(2));
        assert_eq!(generations.get(eve), Some(2));
        assert_eq!(generations.get(dora), Some(3));
        assert_eq!(generations.depth(), 3);
        assert_eq!(
            generations.rows(),
            vec![vec![g1, g2], vec![alice, bob], vec![carol, eve], vec![dora]]
        );
        assert_eq!(generations.order[0], (g1, 0));
    }

    #[test]
    fn test_unknown_start_is_not_found() {
        let (b, _) = four_generations();
        let graph = KinshipGraph::new(&b.tree);
        assert!(matches!(
            TraversalEngine::assign_generations(&graph, PersonId(404)),
            Err(Error::NotFound(_))
        ));
    }
}
