//! Exact search engine - case-insensitive substring matching

use async_trait::async_trait;

use crate::traits::{check_query, rank, Result, SearchEngine, SearchHit};
use kinfolk_core::{Person, PersonQuery};

/// Simple exact substring search engine (stateless)
pub struct ExactSearchEngine;

impl ExactSearchEngine {
    pub fn new() -> Self {
        Self
    }

    /// 1.0 for a whole name part, 0.8 for a part prefix, 0.5 for any
    /// other substring of the full name
    fn score(person: &Person, needle: &str) -> Option<f32> {
        let parts: Vec<String> = person.name.parts().map(str::to_lowercase).collect();
        if parts.iter().any(|p| p == needle) {
            Some(1.0)
        } else if parts.iter().any(|p| p.starts_with(needle)) {
            Some(0.8)
        } else if parts.join(" ").contains(needle) {
            Some(0.5)
        } else {
            None
        }
    }
}

impl Default for ExactSearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchEngine for ExactSearchEngine {
    async fn search(&self, query: &PersonQuery, persons: &[Person]) -> Result<Vec<SearchHit>> {
        check_query(query)?;
        let Some(text) = query.search_text() else {
            return Ok(Vec::new());
        };
        let needle = text.to_lowercase();

        let hits = persons
            .iter()
            .filter(|p| query.admits(p))
            .filter_map(|p| {
                Self::score(p, &needle).map(|score| SearchHit {
                    person: p.clone(),
                    score,
                })
            })
            .collect();

        let hits = rank(hits, query);
        tracing::debug!("Exact search for '{}' matched {} persons", text, hits.len());
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::tests::people;
    use kinfolk_core::PersonId;

    #[tokio::test]
    async fn test_exact_search() {
        let search = ExactSearchEngine::new();
        let persons = people();

        let hits = search.search(&PersonQuery::new("john"), &persons).await.unwrap();
        let ids: Vec<PersonId> = hits.iter().map(|h| h.person.id).collect();
        // Whole-part match first, then prefixes in id order
        assert_eq!(ids, vec![PersonId(1), PersonId(2), PersonId(3)]);
    }

    #[tokio::test]
    async fn test_matches_nickname_and_full_name() {
        let search = ExactSearchEngine::new();
        let persons = people();

        let hits = search.search(&PersonQuery::new("MOLLY"), &persons).await.unwrap();
        assert_eq!(hits[0].person.id, PersonId(4));

        let hits = search
            .search(&PersonQuery::new("john smith"), &persons)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_short_query_and_paging() {
        let search = ExactSearchEngine::new();
        let persons = people();

        assert!(search
            .search(&PersonQuery::new("j"), &persons)
            .await
            .unwrap()
            .is_empty());

        let page = search
            .search(&PersonQuery::new("jo").with_offset(1).with_limit(1), &persons)
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].person.id, PersonId(2));

        assert!(search
            .search(&PersonQuery::new("jo").with_limit(0), &persons)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_trashed_person_is_not_found() {
        let search = ExactSearchEngine::new();
        let mut persons = people();
        persons[0].deleted_at = Some(chrono::Utc::now());

        let hits = search.search(&PersonQuery::new("smith"), &persons).await.unwrap();
        assert!(hits.is_empty());
        let hits = search.search(&PersonQuery::new("john"), &persons).await.unwrap();
        assert!(hits.iter().all(|h| h.person.id != PersonId(1)));
    }
}
