//! The stored state of a family tree and the change sets applied to it

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::Error;
use crate::event::Event;
use crate::family::Family;
use crate::ids::{DocumentId, EventId, FamilyId, PersonId};
use crate::person::Person;

/// The kinds of record the tree stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    Family,
    Event,
    Document,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [Self::Person, Self::Family, Self::Event, Self::Document];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Family => "family",
            Self::Event => "event",
            Self::Document => "document",
        }
    }

    /// Build a reference to the record of this kind with `id`
    pub fn with_id(self, id: i64) -> EntityRef {
        match self {
            Self::Person => EntityRef::Person(PersonId(id)),
            Self::Family => EntityRef::Family(FamilyId(id)),
            Self::Event => EntityRef::Event(EventId(id)),
            Self::Document => EntityRef::Document(DocumentId(id)),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "person" => Ok(Self::Person),
            "family" => Ok(Self::Family),
            "event" => Ok(Self::Event),
            "document" => Ok(Self::Document),
            other => Err(Error::Validation(format!("Unknown entity kind '{}'", other))),
        }
    }
}

/// A typed reference to any stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Person(PersonId),
    Family(FamilyId),
    Event(EventId),
    Document(DocumentId),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Person(_) => EntityKind::Person,
            Self::Family(_) => EntityKind::Family,
            Self::Event(_) => EntityKind::Event,
            Self::Document(_) => EntityKind::Document,
        }
    }

    pub fn raw_id(&self) -> i64 {
        match self {
            Self::Person(id) => id.0,
            Self::Family(id) => id.0,
            Self::Event(id) => id.0,
            Self::Document(id) => id.0,
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind(), self.raw_id())
    }
}

impl From<PersonId> for EntityRef {
    fn from(id: PersonId) -> Self {
        Self::Person(id)
    }
}

impl From<FamilyId> for EntityRef {
    fn from(id: FamilyId) -> Self {
        Self::Family(id)
    }
}

impl From<EventId> for EntityRef {
    fn from(id: EventId) -> Self {
        Self::Event(id)
    }
}

impl From<DocumentId> for EntityRef {
    fn from(id: DocumentId) -> Self {
        Self::Document(id)
    }
}

/// Last id handed out for each record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sequences {
    pub person: i64,
    pub family: i64,
    pub event: i64,
    pub document: i64,
}

impl Sequences {
    pub fn next_person(&mut self) -> PersonId {
        self.person += 1;
        PersonId(self.person)
    }

    pub fn next_family(&mut self) -> FamilyId {
        self.family += 1;
        FamilyId(self.family)
    }

    pub fn next_event(&mut self) -> EventId {
        self.event += 1;
        EventId(self.event)
    }

    pub fn next_document(&mut self) -> DocumentId {
        self.document += 1;
        DocumentId(self.document)
    }

    pub fn get(&self, kind: EntityKind) -> i64 {
        match kind {
            EntityKind::Person => self.person,
            EntityKind::Family => self.family,
            EntityKind::Event => self.event,
            EntityKind::Document => self.document,
        }
    }

    pub fn set(&mut self, kind: EntityKind, value: i64) {
        match kind {
            EntityKind::Person => self.person = value,
            EntityKind::Family => self.family = value,
            EntityKind::Event => self.event = value,
            EntityKind::Document => self.document = value,
        }
    }
}

/// A record in the trash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashEntry {
    pub entity: EntityRef,
    /// Human-readable description of the record
    pub label: String,
    pub deleted_at: DateTime<Utc>,
}

/// Complete stored state: every record, trashed ones included
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyTree {
    pub persons: BTreeMap<PersonId, Person>,
    pub families: BTreeMap<FamilyId, Family>,
    pub events: BTreeMap<EventId, Event>,
    pub documents: BTreeMap<DocumentId, Document>,
    pub sequences: Sequences,
}

impl FamilyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a tree from loaded records.
    ///
    /// Sequences are raised to at least the highest stored id so that a
    /// store with a stale counter never hands out a used id.
    pub fn from_records(
        persons: impl IntoIterator<Item = Person>,
        families: impl IntoIterator<Item = Family>,
        events: impl IntoIterator<Item = Event>,
        documents: impl IntoIterator<Item = Document>,
        sequences: Sequences,
    ) -> Self {
        let mut tree = Self {
            persons: persons.into_iter().map(|p| (p.id, p)).collect(),
            families: families.into_iter().map(|f| (f.id, f)).collect(),
            events: events.into_iter().map(|e| (e.id, e)).collect(),
            documents: documents.into_iter().map(|d| (d.id, d)).collect(),
            sequences,
        };
        tree.raise_sequences();
        tree
    }

    fn raise_sequences(&mut self) {
        let seq = &mut self.sequences;
        if let Some(id) = self.persons.keys().next_back() {
            seq.person = seq.person.max(id.0);
        }
        if let Some(id) = self.families.keys().next_back() {
            seq.family = seq.family.max(id.0);
        }
        if let Some(id) = self.events.keys().next_back() {
            seq.event = seq.event.max(id.0);
        }
        if let Some(id) = self.documents.keys().next_back() {
            seq.document = seq.document.max(id.0);
        }
    }

    /// Live (not trashed) person
    pub fn live_person(&self, id: PersonId) -> Option<&Person> {
        self.persons.get(&id).filter(|p| !p.is_deleted())
    }

    pub fn live_family(&self, id: FamilyId) -> Option<&Family> {
        self.families.get(&id).filter(|f| !f.is_deleted())
    }

    pub fn live_event(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id).filter(|e| !e.is_deleted())
    }

    pub fn live_document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(&id).filter(|d| !d.is_deleted())
    }

    pub fn live_persons(&self) -> impl Iterator<Item = &Person> {
        self.persons.values().filter(|p| !p.is_deleted())
    }

    pub fn live_families(&self) -> impl Iterator<Item = &Family> {
        self.families.values().filter(|f| !f.is_deleted())
    }

    pub fn live_events(&self) -> impl Iterator<Item = &Event> {
        self.events.values().filter(|e| !e.is_deleted())
    }

    pub fn live_documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values().filter(|d| !d.is_deleted())
    }

    /// Live events of a person, oldest first; undated events sort last
    pub fn events_for(&self, person: PersonId) -> Vec<&Event> {
        let mut events: Vec<&Event> = self.live_events().filter(|e| e.person == person).collect();
        events.sort_by_key(|e| (e.date.is_none(), e.date, e.id));
        events
    }

    pub fn documents_for(&self, person: PersonId) -> Vec<&Document> {
        self.live_documents()
            .filter(|d| d.person == Some(person))
            .collect()
    }

    /// Soft-delete timestamp of a stored record, `None` if live or absent
    pub fn deleted_at(&self, entity: EntityRef) -> Option<DateTime<Utc>> {
        match entity {
            EntityRef::Person(id) => self.persons.get(&id)?.deleted_at,
            EntityRef::Family(id) => self.families.get(&id)?.deleted_at,
            EntityRef::Event(id) => self.events.get(&id)?.deleted_at,
            EntityRef::Document(id) => self.documents.get(&id)?.deleted_at,
        }
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Person(id) => self.persons.contains_key(&id),
            EntityRef::Family(id) => self.families.contains_key(&id),
            EntityRef::Event(id) => self.events.contains_key(&id),
            EntityRef::Document(id) => self.documents.contains_key(&id),
        }
    }

    /// Short description of a stored record for listings
    pub fn label(&self, entity: EntityRef) -> String {
        let person_name = |id: PersonId| {
            self.persons
                .get(&id)
                .map(|p| p.full_name())
                .unwrap_or_else(|| format!("person {}", id))
        };
        match entity {
            EntityRef::Person(id) => person_name(id),
            EntityRef::Family(id) => match self.families.get(&id) {
                Some(family) => {
                    let names: Vec<String> = family.partners().map(&person_name).collect();
                    if names.is_empty() {
                        "Family (unknown parents)".to_string()
                    } else {
                        format!("Family of {}", names.join(" & "))
                    }
                }
                None => entity.to_string(),
            },
            EntityRef::Event(id) => match self.events.get(&id) {
                Some(event) => format!("{} of {}", event.kind, person_name(event.person)),
                None => entity.to_string(),
            },
            EntityRef::Document(id) => match self.documents.get(&id) {
                Some(doc) => doc.title.clone(),
                None => entity.to_string(),
            },
        }
    }

    /// Everything currently in the trash, most recently deleted first
    pub fn trash(&self) -> Vec<TrashEntry> {
        let persons = self
            .persons
            .values()
            .filter_map(|p| Some((EntityRef::Person(p.id), p.deleted_at?)));
        let families = self
            .families
            .values()
            .filter_map(|f| Some((EntityRef::Family(f.id), f.deleted_at?)));
        let events = self
            .events
            .values()
            .filter_map(|e| Some((EntityRef::Event(e.id), e.deleted_at?)));
        let documents = self
            .documents
            .values()
            .filter_map(|d| Some((EntityRef::Document(d.id), d.deleted_at?)));

        let mut entries: Vec<TrashEntry> = persons
            .chain(families)
            .chain(events)
            .chain(documents)
            .map(|(entity, deleted_at)| TrashEntry {
                entity,
                label: self.label(entity),
                deleted_at,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.deleted_at
                .cmp(&a.deleted_at)
                .then_with(|| a.entity.cmp(&b.entity))
        });
        entries
    }

    /// Apply a committed change set: upserts first, then purges
    pub fn apply(&mut self, changes: &ChangeSet) {
        for (id, person) in &changes.persons {
            self.persons.insert(*id, person.clone());
        }
        for (id, family) in &changes.families {
            self.families.insert(*id, family.clone());
        }
        for (id, event) in &changes.events {
            self.events.insert(*id, event.clone());
        }
        for (id, document) in &changes.documents {
            self.documents.insert(*id, document.clone());
        }
        for entity in &changes.purged {
            match entity {
                EntityRef::Person(id) => {
                    self.persons.remove(id);
                }
                EntityRef::Family(id) => {
                    self.families.remove(id);
                }
                EntityRef::Event(id) => {
                    self.events.remove(id);
                }
                EntityRef::Document(id) => {
                    self.documents.remove(id);
                }
            }
        }
        if let Some(sequences) = changes.sequences {
            self.sequences = sequences;
        }
    }
}

/// The writes produced by one transaction, committed atomically by a backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub persons: BTreeMap<PersonId, Person>,
    pub families: BTreeMap<FamilyId, Family>,
    pub events: BTreeMap<EventId, Event>,
    pub documents: BTreeMap<DocumentId, Document>,
    /// Records to remove physically
    pub purged: BTreeSet<EntityRef>,
    /// New sequence values, when ids were handed out
    pub sequences: Option<Sequences>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
            && self.families.is_empty()
            && self.events.is_empty()
            && self.documents.is_empty()
            && self.purged.is_empty()
            && self.sequences.is_none()
    }

    /// Number of record writes (upserts and purges)
    pub fn len(&self) -> usize {
        self.persons.len()
            + self.families.len()
            + self.events.len()
            + self.documents.len()
            + self.purged.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::person::NewPerson;

    #[test]
    fn test_entity_ref_wire_format() {
        let json = serde_json::to_value(EntityRef::Family(FamilyId(4))).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "family", "id": 4}));
        assert_eq!(EntityRef::Person(PersonId(3)).to_string(), "person 3");
        assert_eq!(
            "Event".parse::<EntityKind>().unwrap().with_id(8),
            EntityRef::Event(EventId(8))
        );
    }

    #[test]
    fn test_from_records_raises_sequences() {
        let now = Utc::now();
        let person = NewPerson::new("Ada", "Byron").into_person(PersonId(7), now);
        let tree = FamilyTree::from_records(vec![person], vec![], vec![], vec![], Sequences::default());
        assert_eq!(tree.sequences.person, 7);
        assert_eq!(tree.sequences.family, 0);
    }

    #[test]
    fn test_apply_and_trash_order() {
        let now = Utc::now();
        let mut tree = FamilyTree::new();
        let mut changes = ChangeSet::default();
        let mut older = NewPerson::new("Ada", "Byron").into_person(PersonId(1), now);
        older.deleted_at = Some(now);
        let mut newer = NewPerson::new("Anne", "Milbanke").into_person(PersonId(2), now);
        newer.deleted_at = Some(now + chrono::Duration::seconds(5));
        changes.persons.insert(PersonId(1), older);
        changes.persons.insert(PersonId(2), newer);
        tree.apply(&changes);

        let trash = tree.trash();
        assert_eq!(trash.len(), 2);
        assert_eq!(trash[0].entity, EntityRef::Person(PersonId(2)));
        assert_eq!(trash[0].label, "Anne Milbanke");

        let mut purge = ChangeSet::default();
        purge.purged.insert(EntityRef::Person(PersonId(1)));
        tree.apply(&purge);
        assert!(!tree.contains(EntityRef::Person(PersonId(1))));
        assert_eq!(tree.trash().len(), 1);
    }
}
