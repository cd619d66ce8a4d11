//! Kinfolk Core - Kinship graph engine for a personal family tree
//!
//! This crate provides the record types (persons, families, events and
//! documents), the consistency rules every mutation passes through, the
//! read-only kinship projection and the traversal algorithms built on it.

pub mod date;
pub mod document;
pub mod error;
pub mod event;
pub mod family;
pub mod graph;
pub mod ids;
pub mod kinship;
pub mod limits;
pub mod person;
pub mod query;
pub mod rules;
pub mod transaction;
pub mod traversal;
pub mod tree;

pub use date::{parse_date, Death, LifeDate};
pub use document::{Document, DocumentKind, NewDocument};
pub use error::{Error, Result};
pub use event::{Event, EventKind, NewEvent};
pub use family::{Family, FamilyPatch, NewFamily, RelationshipType, UnionStatus};
pub use graph::{Genealogy, RelativesReport, TreeStats};
pub use ids::{DocumentId, EventId, FamilyId, PersonId};
pub use kinship::KinshipGraph;
pub use person::{Gender, NewPerson, Person, PersonName, PersonPatch};
pub use query::PersonQuery;
pub use transaction::Transaction;
pub use traversal::{
    Generations, Lineage, LineageEntry, LineageQuery, LineageReport, TraversalEngine,
    TraversalStats,
};
pub use tree::{ChangeSet, EntityKind, EntityRef, FamilyTree, Sequences, TrashEntry};
