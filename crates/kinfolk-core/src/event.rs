//! Life events attached to a person

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::ids::{EventId, PersonId};
use crate::limits::{validate_place, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Baptism,
    Confirmation,
    Graduation,
    Military,
    Immigration,
    Emigration,
    Residence,
    Occupation,
    Burial,
    Other,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        Self::Baptism,
        Self::Confirmation,
        Self::Graduation,
        Self::Military,
        Self::Immigration,
        Self::Emigration,
        Self::Residence,
        Self::Occupation,
        Self::Burial,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Baptism => "baptism",
            Self::Confirmation => "confirmation",
            Self::Graduation => "graduation",
            Self::Military => "military",
            Self::Immigration => "immigration",
            Self::Emigration => "emigration",
            Self::Residence => "residence",
            Self::Occupation => "occupation",
            Self::Burial => "burial",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| Error::Validation(format!("Unknown event kind '{}'", s)))
    }
}

/// A dated happening in a person's life
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub person: PersonId,
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Event {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_place("event place", self.place.as_deref())
    }
}

/// Data for recording a new event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub person: PersonId,
    pub kind: EventKind,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewEvent {
    pub fn new(person: PersonId, kind: EventKind) -> Self {
        Self {
            person,
            kind,
            date: None,
            place: None,
            description: None,
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn at(mut self, place: impl Into<String>) -> Self {
        self.place = Some(place.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn into_event(self, id: EventId, now: DateTime<Utc>) -> Event {
        Event {
            id,
            person: self.person,
            kind: self.kind,
            date: self.date,
            place: self.place,
            description: self.description,
            created_at: now,
            deleted_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_names() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("coronation".parse::<EventKind>().is_err());
    }
}
