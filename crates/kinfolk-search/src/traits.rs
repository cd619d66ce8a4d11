//! Search engine traits

use async_trait::async_trait;
use kinfolk_core::{Person, PersonQuery};
use serde::Serialize;

pub use crate::error::{SearchError, SearchResult as Result};

/// Result from search including score
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub person: Person,
    pub score: f32,
}

/// Trait for search engines
///
/// Engines are stateless: callers pass the persons to search, usually the
/// live persons of a snapshot.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Best matches first, after the query's filters, offset and limit
    async fn search(&self, query: &PersonQuery, persons: &[Person]) -> Result<Vec<SearchHit>>;
}

/// Reject queries no engine can answer
pub(crate) fn check_query(query: &PersonQuery) -> Result<()> {
    if query.limit == 0 {
        return Err(SearchError::Query("limit must be at least 1".to_string()));
    }
    Ok(())
}

/// Order hits best first (ties by id) and apply offset and limit
pub(crate) fn rank(mut hits: Vec<SearchHit>, query: &PersonQuery) -> Vec<SearchHit> {
    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.person.id.cmp(&b.person.id))
    });
    hits.into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Utc;
    use kinfolk_core::{NewPerson, Person, PersonId};

    pub(crate) fn people() -> Vec<Person> {
        let now = Utc::now();
        vec![
            NewPerson::new("John", "Smith").into_person(PersonId(1), now),
            NewPerson::new("Jane", "Doe")
                .with_maiden_name("Johnson")
                .into_person(PersonId(2), now),
            NewPerson::new("Johnny", "Appleseed").into_person(PersonId(3), now),
            NewPerson::new("Mary", "Brown")
                .with_nickname("Molly")
                .into_person(PersonId(4), now),
        ]
    }
}
