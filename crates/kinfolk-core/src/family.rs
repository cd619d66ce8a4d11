//! Family (union) nodes
//!
//! A family ties up to two partners to the children whose `parent_family`
//! points at it. Either partner slot may be empty.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::ids::{FamilyId, PersonId};
use crate::limits::{validate_place, validate_title, ValidationError};

/// Kind of union between the partners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    #[default]
    Marriage,
    CivilPartnership,
    Partnership,
    Engagement,
    Relationship,
    #[serde(alias = "one_night")]
    Casual,
    Unknown,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Marriage => "marriage",
            Self::CivilPartnership => "civil_partnership",
            Self::Partnership => "partnership",
            Self::Engagement => "engagement",
            Self::Relationship => "relationship",
            Self::Casual => "casual",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "marriage" => Ok(Self::Marriage),
            "civil_partnership" => Ok(Self::CivilPartnership),
            "partnership" => Ok(Self::Partnership),
            "engagement" => Ok(Self::Engagement),
            "relationship" => Ok(Self::Relationship),
            "casual" | "one_night" => Ok(Self::Casual),
            "unknown" => Ok(Self::Unknown),
            other => Err(Error::Validation(format!(
                "Unknown relationship type '{}'",
                other
            ))),
        }
    }
}

/// Current state of the union
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnionStatus {
    #[default]
    Active,
    Divorced,
    Widowed,
    Separated,
    Annulled,
    Ended,
}

impl UnionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Divorced => "divorced",
            Self::Widowed => "widowed",
            Self::Separated => "separated",
            Self::Annulled => "annulled",
            Self::Ended => "ended",
        }
    }
}

impl std::fmt::Display for UnionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UnionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "divorced" => Ok(Self::Divorced),
            "widowed" => Ok(Self::Widowed),
            "separated" => Ok(Self::Separated),
            "annulled" => Ok(Self::Annulled),
            "ended" => Ok(Self::Ended),
            other => Err(Error::Validation(format!("Unknown union status '{}'", other))),
        }
    }
}

/// A union between up to two partners (an edge bundle in the kinship graph)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Family {
    /// Unique identifier
    pub id: FamilyId,

    #[serde(default)]
    pub partner1: Option<PersonId>,

    #[serde(default)]
    pub partner2: Option<PersonId>,

    #[serde(default)]
    pub relationship: RelationshipType,

    #[serde(default)]
    pub status: UnionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    /// Why the union ended (divorce, death, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Family {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Occupied partner slots, `partner1` first
    pub fn partners(&self) -> impl Iterator<Item = PersonId> {
        self.partner1.into_iter().chain(self.partner2)
    }

    pub fn has_partner(&self, person: PersonId) -> bool {
        self.partner1 == Some(person) || self.partner2 == Some(person)
    }

    /// The partner opposite `person`, if `person` is a partner and the other slot is set
    pub fn other_partner(&self, person: PersonId) -> Option<PersonId> {
        if self.partner1 == Some(person) {
            self.partner2
        } else if self.partner2 == Some(person) {
            self.partner1
        } else {
            None
        }
    }

    /// Check field-level limits
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_place("family place", self.place.as_deref())?;
        validate_title("end reason", self.end_reason.as_deref())?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ValidationError::EndBeforeStart {
                    start_field: "start date",
                    end_field: "end date",
                });
            }
        }
        Ok(())
    }
}

/// Data for creating a new family
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewFamily {
    #[serde(default)]
    pub partner1: Option<PersonId>,
    #[serde(default)]
    pub partner2: Option<PersonId>,
    #[serde(default)]
    pub relationship: RelationshipType,
    #[serde(default)]
    pub status: UnionStatus,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_reason: Option<String>,
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewFamily {
    pub fn union(partner1: PersonId, partner2: PersonId) -> Self {
        Self {
            partner1: Some(partner1),
            partner2: Some(partner2),
            ..Default::default()
        }
    }

    pub fn single_parent(parent: PersonId) -> Self {
        Self {
            partner1: Some(parent),
            ..Default::default()
        }
    }

    /// Placeholder for children whose parents are unknown
    pub fn unknown_parents() -> Self {
        Self::default()
    }

    pub fn with_relationship(mut self, relationship: RelationshipType) -> Self {
        self.relationship = relationship;
        self
    }

    pub fn with_status(mut self, status: UnionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn started(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn ended(mut self, date: NaiveDate, reason: Option<String>) -> Self {
        self.end_date = Some(date);
        self.end_reason = reason;
        self
    }

    pub fn with_place(mut self, place: impl Into<String>) -> Self {
        self.place = Some(place.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn into_family(self, id: FamilyId, now: DateTime<Utc>) -> Family {
        Family {
            id,
            partner1: self.partner1,
            partner2: self.partner2,
            relationship: self.relationship,
            status: self.status,
            start_date: self.start_date,
            end_date: self.end_date,
            end_reason: self.end_reason,
            place: self.place,
            notes: self.notes,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// A partial update to a family; `Some(None)` clears a nullable field
#[derive(Debug, Clone, Default)]
pub struct FamilyPatch {
    pub partner1: Option<Option<PersonId>>,
    pub partner2: Option<Option<PersonId>>,
    pub relationship: Option<RelationshipType>,
    pub status: Option<UnionStatus>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub end_reason: Option<Option<String>>,
    pub place: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl FamilyPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partner1(mut self, partner: Option<PersonId>) -> Self {
        self.partner1 = Some(partner);
        self
    }

    pub fn partner2(mut self, partner: Option<PersonId>) -> Self {
        self.partner2 = Some(partner);
        self
    }

    pub fn status(mut self, status: UnionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn end_date(mut self, date: Option<NaiveDate>) -> Self {
        self.end_date = Some(date);
        self
    }

    /// True when either partner slot is being changed
    pub fn touches_partners(&self) -> bool {
        self.partner1.is_some() || self.partner2.is_some()
    }

    pub fn apply_to(self, family: &mut Family) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        set(&mut family.partner1, self.partner1);
        set(&mut family.partner2, self.partner2);
        set(&mut family.relationship, self.relationship);
        set(&mut family.status, self.status);
        set(&mut family.start_date, self.start_date);
        set(&mut family.end_date, self.end_date);
        set(&mut family.end_reason, self.end_reason);
        set(&mut family.place, self.place);
        set(&mut family.notes, self.notes);
    }
}
