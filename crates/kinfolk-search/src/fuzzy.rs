//! Fuzzy search using nucleo

use async_trait::async_trait;
use nucleo_matcher::{
    pattern::{AtomKind, CaseMatching, Normalization, Pattern},
    Config, Matcher, Utf32Str,
};

use crate::traits::{check_query, rank, Result, SearchEngine, SearchHit};
use kinfolk_core::{Person, PersonQuery};

/// Stateless fuzzy search engine using nucleo
pub struct FuzzySearchEngine;

impl FuzzySearchEngine {
    pub fn new() -> Self {
        Self
    }

    fn create_searchable(person: &Person) -> String {
        person.name.parts().collect::<Vec<_>>().join(" ")
    }
}

impl Default for FuzzySearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchEngine for FuzzySearchEngine {
    async fn search(&self, query: &PersonQuery, persons: &[Person]) -> Result<Vec<SearchHit>> {
        check_query(query)?;
        let Some(text) = query.search_text() else {
            return Ok(Vec::new());
        };

        let pattern = Pattern::new(
            text,
            CaseMatching::Ignore,
            Normalization::Smart,
            AtomKind::Fuzzy,
        );
        let mut matcher = Matcher::new(Config::DEFAULT);
        let mut buf = Vec::new();

        let mut hits = Vec::new();
        for person in persons.iter().filter(|p| query.admits(p)) {
            let searchable = Self::create_searchable(person);
            if let Some(score) = pattern.score(Utf32Str::new(&searchable, &mut buf), &mut matcher)
            {
                hits.push(SearchHit {
                    person: person.clone(),
                    score: score as f32,
                });
            }
        }

        let hits = rank(hits, query);
        tracing::debug!("Fuzzy search for '{}' matched {} persons", text, hits.len());
        Ok(hits)
    }
}
