//! Person search queries

use serde::{Deserialize, Serialize};

use crate::person::{Gender, Person};

/// Shortest query text that produces results
pub const MIN_QUERY_LEN: usize = 2;

fn default_limit() -> usize {
    20
}

/// Search query builder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonQuery {
    /// Text matched against every name part
    pub text: String,

    /// Only persons of this gender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,

    /// Only living (`true`) or deceased (`false`) persons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub living: Option<bool>,

    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default)]
    pub offset: usize,
}

impl PersonQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            gender: None,
            living: None,
            limit: default_limit(),
            offset: 0,
        }
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn living(mut self, living: bool) -> Self {
        self.living = Some(living);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Trimmed query text, or `None` when too short to search
    pub fn search_text(&self) -> Option<&str> {
        let text = self.text.trim();
        (text.chars().count() >= MIN_QUERY_LEN).then_some(text)
    }

    /// Whether `person` passes the non-text filters
    pub fn admits(&self, person: &Person) -> bool {
        if person.is_deleted() {
            return false;
        }
        if let Some(gender) = self.gender {
            if person.gender != gender {
                return false;
            }
        }
        if let Some(living) = self.living {
            if person.is_alive() != living {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::Death;
    use crate::ids::PersonId;
    use crate::person::NewPerson;
    use chrono::Utc;

    #[test]
    fn test_short_text_is_rejected() {
        assert_eq!(PersonQuery::new(" a ").search_text(), None);
        assert_eq!(PersonQuery::new(" ab ").search_text(), Some("ab"));
        assert_eq!(PersonQuery::new("ab").limit, 20);
    }

    #[test]
    fn test_filters() {
        let person = NewPerson::new("Ada", "Byron")
            .with_gender(Gender::Female)
            .died(Death::DateUnknown)
            .into_person(PersonId(1), Utc::now());
        assert!(PersonQuery::new("ada").admits(&person));
        assert!(!PersonQuery::new("ada").living(true).admits(&person));
        assert!(!PersonQuery::new("ada").with_gender(Gender::Male).admits(&person));
    }

    #[test]
    fn test_trashed_person_is_not_admitted() {
        let mut person = NewPerson::new("Ada", "Byron").into_person(PersonId(1), Utc::now());
        assert!(PersonQuery::new("ada").admits(&person));
        person.deleted_at = Some(Utc::now());
        assert!(!PersonQuery::new("ada").admits(&person));
    }
}
