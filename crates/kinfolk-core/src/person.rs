//! Person (node) types

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::date::{whole_years_between, Death, LifeDate};
use crate::error::Error;
use crate::ids::{FamilyId, PersonId};
use crate::limits::{
    validate_birth_order, validate_custom_fields, validate_optional_name, validate_place,
    validate_required_name, ValidationError,
};

/// Recorded gender of a person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            "unknown" | "u" | "" => Ok(Self::Unknown),
            other => Err(Error::Validation(format!("Unknown gender '{}'", other))),
        }
    }
}

/// The name parts of a person
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonName {
    pub first: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle: Option<String>,
    pub last: String,
    /// Birth surname, if it differs from `last`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maiden: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl PersonName {
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            last: last.into(),
            ..Default::default()
        }
    }

    /// "First Middle Last"
    pub fn full_name(&self) -> String {
        match &self.middle {
            Some(middle) if !middle.is_empty() => {
                format!("{} {} {}", self.first, middle, self.last)
            }
            _ => format!("{} {}", self.first, self.last),
        }
    }

    /// Full name followed by the maiden name, when one is recorded
    pub fn display_name(&self) -> String {
        match &self.maiden {
            Some(maiden) if !maiden.is_empty() => format!("{} (née {})", self.full_name(), maiden),
            _ => self.full_name(),
        }
    }

    /// Every non-empty name part, in display order
    pub fn parts(&self) -> impl Iterator<Item = &str> {
        [
            Some(self.first.as_str()),
            self.middle.as_deref(),
            Some(self.last.as_str()),
            self.maiden.as_deref(),
            self.nickname.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_required_name("first name", &self.first)?;
        validate_required_name("last name", &self.last)?;
        validate_optional_name("middle name", self.middle.as_deref())?;
        validate_optional_name("maiden name", self.maiden.as_deref())?;
        validate_optional_name("nickname", self.nickname.as_deref())?;
        Ok(())
    }
}

/// A person in the family tree (a node)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Unique identifier
    pub id: PersonId,

    pub name: PersonName,

    #[serde(default)]
    pub gender: Gender,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth: Option<LifeDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_place: Option<String>,

    #[serde(default)]
    pub death: Death,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_place: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Arbitrary user-defined attributes
    #[serde(default)]
    pub custom_fields: BTreeMap<String, serde_json::Value>,

    /// Family in which this person is a child
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_family: Option<FamilyId>,

    /// Adoptive family, independent of `parent_family`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adoptive_family: Option<FamilyId>,

    #[serde(default)]
    pub is_twin: bool,

    /// Position among the children of `parent_family`, starting at 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_order: Option<u32>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Set while the person is in the trash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Person {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// True unless a death (dated or not) has been recorded
    pub fn is_alive(&self) -> bool {
        !self.death.is_deceased()
    }

    /// Age in whole years at death, or on `today` for the living.
    ///
    /// `None` when the birth date is unknown, or the person is deceased
    /// with no recorded death date.
    pub fn age_on(&self, today: NaiveDate) -> Option<i32> {
        let birth = self.birth?.date;
        let end = match self.death {
            Death::NotRecorded => today,
            Death::Dated(death) => death.date,
            Death::DateUnknown => return None,
        };
        Some(whole_years_between(birth, end))
    }

    pub fn full_name(&self) -> String {
        self.name.full_name()
    }

    pub fn display_name(&self) -> String {
        self.name.display_name()
    }

    /// Check field-level limits
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.name.validate()?;
        validate_place("birth place", self.birth_place.as_deref())?;
        validate_place("death place", self.death_place.as_deref())?;
        validate_place("occupation", self.occupation.as_deref())?;
        validate_custom_fields(self.custom_fields.keys())?;
        validate_birth_order(self.birth_order)?;
        if let (Some(birth), Some(death)) = (self.birth, self.death.date()) {
            if death.date < birth.date {
                return Err(ValidationError::EndBeforeStart {
                    start_field: "birth date",
                    end_field: "death date",
                });
            }
        }
        Ok(())
    }
}

/// Data for creating a new person
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPerson {
    pub name: PersonName,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub birth: Option<LifeDate>,
    #[serde(default)]
    pub birth_place: Option<String>,
    #[serde(default)]
    pub death: Death,
    #[serde(default)]
    pub death_place: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub parent_family: Option<FamilyId>,
    #[serde(default)]
    pub adoptive_family: Option<FamilyId>,
    #[serde(default)]
    pub is_twin: bool,
    #[serde(default)]
    pub birth_order: Option<u32>,
}

impl NewPerson {
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            name: PersonName::new(first, last),
            ..Default::default()
        }
    }

    pub fn with_middle_name(mut self, middle: impl Into<String>) -> Self {
        self.name.middle = Some(middle.into());
        self
    }

    pub fn with_maiden_name(mut self, maiden: impl Into<String>) -> Self {
        self.name.maiden = Some(maiden.into());
        self
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.name.nickname = Some(nickname.into());
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn born(mut self, birth: LifeDate) -> Self {
        self.birth = Some(birth);
        self
    }

    pub fn born_in(mut self, place: impl Into<String>) -> Self {
        self.birth_place = Some(place.into());
        self
    }

    pub fn died(mut self, death: Death) -> Self {
        self.death = death;
        self
    }

    pub fn died_in(mut self, place: impl Into<String>) -> Self {
        self.death_place = Some(place.into());
        self
    }

    pub fn with_occupation(mut self, occupation: impl Into<String>) -> Self {
        self.occupation = Some(occupation.into());
        self
    }

    pub fn with_biography(mut self, biography: impl Into<String>) -> Self {
        self.biography = Some(biography.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_custom_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom_fields.insert(key.into(), value);
        self
    }

    pub fn child_of(mut self, family: FamilyId) -> Self {
        self.parent_family = Some(family);
        self
    }

    pub fn adopted_into(mut self, family: FamilyId) -> Self {
        self.adoptive_family = Some(family);
        self
    }

    pub fn with_birth_order(mut self, order: u32) -> Self {
        self.birth_order = Some(order);
        self
    }

    pub fn twin(mut self) -> Self {
        self.is_twin = true;
        self
    }

    /// Materialize the record under a store-assigned id
    pub fn into_person(self, id: PersonId, now: DateTime<Utc>) -> Person {
        Person {
            id,
            name: self.name,
            gender: self.gender,
            birth: self.birth,
            birth_place: self.birth_place,
            death: self.death,
            death_place: self.death_place,
            occupation: self.occupation,
            biography: self.biography,
            notes: self.notes,
            custom_fields: self.custom_fields,
            parent_family: self.parent_family,
            adoptive_family: self.adoptive_family,
            is_twin: self.is_twin,
            birth_order: self.birth_order,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// A partial update to a person.
///
/// `None` leaves a field untouched; for nullable fields `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct PersonPatch {
    pub first: Option<String>,
    pub middle: Option<Option<String>>,
    pub last: Option<String>,
    pub maiden: Option<Option<String>>,
    pub nickname: Option<Option<String>>,
    pub gender: Option<Gender>,
    pub birth: Option<Option<LifeDate>>,
    pub birth_place: Option<Option<String>>,
    pub death: Option<Death>,
    pub death_place: Option<Option<String>>,
    pub occupation: Option<Option<String>>,
    pub biography: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    /// Custom fields to set (`Some`) or remove (`None`)
    pub custom_fields: BTreeMap<String, Option<serde_json::Value>>,
    pub parent_family: Option<Option<FamilyId>>,
    pub adoptive_family: Option<Option<FamilyId>>,
    pub is_twin: Option<bool>,
    pub birth_order: Option<Option<u32>>,
}

impl PersonPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first_name(mut self, first: impl Into<String>) -> Self {
        self.first = Some(first.into());
        self
    }

    pub fn last_name(mut self, last: impl Into<String>) -> Self {
        self.last = Some(last.into());
        self
    }

    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn birth(mut self, birth: Option<LifeDate>) -> Self {
        self.birth = Some(birth);
        self
    }

    pub fn death(mut self, death: Death) -> Self {
        self.death = Some(death);
        self
    }

    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn custom_field(mut self, key: impl Into<String>, value: Option<serde_json::Value>) -> Self {
        self.custom_fields.insert(key.into(), value);
        self
    }

    pub fn parent_family(mut self, family: Option<FamilyId>) -> Self {
        self.parent_family = Some(family);
        self
    }

    pub fn adoptive_family(mut self, family: Option<FamilyId>) -> Self {
        self.adoptive_family = Some(family);
        self
    }

    pub fn birth_order(mut self, order: Option<u32>) -> Self {
        self.birth_order = Some(order);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
            && self.middle.is_none()
            && self.last.is_none()
            && self.maiden.is_none()
            && self.nickname.is_none()
            && self.gender.is_none()
            && self.birth.is_none()
            && self.birth_place.is_none()
            && self.death.is_none()
            && self.death_place.is_none()
            && self.occupation.is_none()
            && self.biography.is_none()
            && self.notes.is_none()
            && self.custom_fields.is_empty()
            && self.parent_family.is_none()
            && self.adoptive_family.is_none()
            && self.is_twin.is_none()
            && self.birth_order.is_none()
    }

    /// Write the patched fields into `person`
    pub fn apply_to(self, person: &mut Person) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        set(&mut person.name.first, self.first);
        set(&mut person.name.middle, self.middle);
        set(&mut person.name.last, self.last);
        set(&mut person.name.maiden, self.maiden);
        set(&mut person.name.nickname, self.nickname);
        set(&mut person.gender, self.gender);
        set(&mut person.birth, self.birth);
        set(&mut person.birth_place, self.birth_place);
        set(&mut person.death, self.death);
        set(&mut person.death_place, self.death_place);
        set(&mut person.occupation, self.occupation);
        set(&mut person.biography, self.biography);
        set(&mut person.notes, self.notes);
        set(&mut person.parent_family, self.parent_family);
        set(&mut person.adoptive_family, self.adoptive_family);
        set(&mut person.is_twin, self.is_twin);
        set(&mut person.birth_order, self.birth_order);
        for (key, value) in self.custom_fields {
            match value {
                Some(value) => {
                    person.custom_fields.insert(key, value);
                }
                None => {
                    person.custom_fields.remove(&key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(now: DateTime<Utc>) -> Person {
        NewPerson::new("Mary", "Smith")
            .with_middle_name("Ann")
            .with_maiden_name("Jones")
            .with_gender(Gender::Female)
            .born(LifeDate::exact(NaiveDate::from_ymd_opt(1900, 5, 20).unwrap()))
            .into_person(PersonId(1), now)
    }

    #[test]
    fn test_names() {
        let person = sample(Utc::now());
        assert_eq!(person.full_name(), "Mary Ann Smith");
        assert_eq!(person.display_name(), "Mary Ann Smith (née Jones)");
        assert_eq!(
            person.name.parts().collect::<Vec<_>>(),
            vec!["Mary", "Ann", "Smith", "Jones"]
        );
    }

    #[test]
    fn test_alive_and_age() {
        let mut person = sample(Utc::now());
        let today = NaiveDate::from_ymd_opt(1950, 5, 19).unwrap();
        assert!(person.is_alive());
        assert_eq!(person.age_on(today), Some(49));

        person.death = Death::Dated(LifeDate::exact(NaiveDate::from_ymd_opt(1940, 5, 20).unwrap()));
        assert!(!person.is_alive());
        assert_eq!(person.age_on(today), Some(40));

        person.death = Death::DateUnknown;
        assert!(!person.is_alive());
        assert_eq!(person.age_on(today), None);
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!("F".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("male".parse::<Gender>().unwrap(), Gender::Male);
        assert!(matches!("robot".parse::<Gender>(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate() {
        let mut person = sample(Utc::now());
        assert!(person.validate().is_ok());

        person.death = Death::Dated(LifeDate::exact(NaiveDate::from_ymd_opt(1899, 1, 1).unwrap()));
        assert!(person.validate().is_err());

        person.death = Death::NotRecorded;
        person.name.first = String::new();
        assert_eq!(
            person.validate(),
            Err(ValidationError::EmptyField {
                field: "first name"
            })
        );
    }

    #[test]
    fn test_patch_apply() {
        let mut person = sample(Utc::now());
        person.custom_fields.insert("religion".into(), serde_json::json!("Catholic"));

        let patch = PersonPatch::new()
            .last_name("Brown")
            .notes(Some("moved to Ohio".into()))
            .custom_field("religion", None)
            .custom_field("eye_color", Some(serde_json::json!("green")));
        assert!(!patch.is_empty());
        patch.apply_to(&mut person);

        assert_eq!(person.name.last, "Brown");
        assert_eq!(person.name.first, "Mary");
        assert_eq!(person.notes.as_deref(), Some("moved to Ohio"));
        assert!(!person.custom_fields.contains_key("religion"));
        assert_eq!(person.custom_fields["eye_color"], "green");
        assert!(PersonPatch::new().is_empty());
    }
}
