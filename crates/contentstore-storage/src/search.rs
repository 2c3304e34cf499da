//! Free-text search across content types.
//!
//! A query is split into lower-case terms. Terms shorter than two characters
//! are dropped, stop words become optional terms and every other term is
//! required. A record matches when each required term occurs in at least one
//! of its text fields. Hits are ranked by a weighted count of matching
//! (term, field) pairs, required terms weighing twice as much as optional
//! ones, then by identity, newest first.

use std::collections::BTreeMap;
use std::sync::Arc;

use contentstore_core::{Connection, ContentRecord, ContentType, Error, Result, Value};
use contentstore_query::{Filter, Operator, Predicate, QueryOptions, QueryPlan};
use serde::Serialize;

use crate::Storage;

const MIN_TERM_LEN: usize = 2;
const REQUIRED_WEIGHT: u32 = 2;
const OPTIONAL_WEIGHT: u32 = 1;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "in",
    "is", "it", "its", "of", "on", "or", "that", "the", "this", "to", "was", "were", "with",
];

/// A parsed free-text query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    /// The normalized input: kept terms joined by single spaces.
    pub sanitized: String,
    /// Terms every hit must contain.
    pub required: Vec<String>,
    /// Terms that only improve ranking.
    pub optional: Vec<String>,
    /// False when no required term survived normalization.
    pub valid: bool,
}

impl SearchQuery {
    /// Parse free text.
    ///
    /// ```
    /// use contentstore_storage::SearchQuery;
    ///
    /// let query = SearchQuery::parse("The Koala, and the BEAR");
    /// assert_eq!(query.required, vec!["koala", "bear"]);
    /// assert_eq!(query.optional, vec!["the", "and"]);
    /// assert!(query.valid);
    /// assert!(!SearchQuery::parse("x").valid);
    /// ```
    pub fn parse(text: &str) -> Self {
        let lower = text.to_lowercase();
        let mut required: Vec<String> = Vec::new();
        let mut optional: Vec<String> = Vec::new();
        let mut kept = Vec::new();

        for term in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= MIN_TERM_LEN)
        {
            kept.push(term);
            let bucket = if STOP_WORDS.contains(&term) {
                &mut optional
            } else {
                &mut required
            };
            if !bucket.iter().any(|t| t == term) {
                bucket.push(term.to_string());
            }
        }

        Self {
            sanitized: kept.join(" "),
            valid: !required.is_empty(),
            required,
            optional,
        }
    }

    fn weighted_terms(&self) -> impl Iterator<Item = (&str, u32)> {
        self.required
            .iter()
            .map(|t| (t.as_str(), REQUIRED_WEIGHT))
            .chain(self.optional.iter().map(|t| (t.as_str(), OPTIONAL_WEIGHT)))
    }

    /// Ranking score of a record: for every term and every text field of
    /// the record that contains it, the term's weight.
    pub fn score(&self, record: &ContentRecord) -> u32 {
        let Some(ct) = record.content_type() else {
            return 0;
        };
        let texts: Vec<String> = ct
            .text_fields()
            .filter_map(|f| record.get(&f.name))
            .filter(|v| !v.is_null())
            .map(|v| v.to_text().to_lowercase())
            .collect();

        self.weighted_terms()
            .map(|(term, weight)| {
                weight * texts.iter().filter(|text| text.contains(term)).count() as u32
            })
            .sum()
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Ranking score, see [`SearchQuery::score`].
    pub score: u32,
    /// The matching record.
    pub record: ContentRecord,
}

/// Ranked hits of a search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Number of hits.
    pub no_of_results: usize,
    /// The parsed query.
    pub query: SearchQuery,
    /// Hits, best first.
    pub hits: Vec<SearchHit>,
}

impl SearchResult {
    /// Hits by content type key, each group in rank order.
    pub fn grouped(&self) -> BTreeMap<&str, Vec<&SearchHit>> {
        let mut groups: BTreeMap<&str, Vec<&SearchHit>> = BTreeMap::new();
        for hit in &self.hits {
            if let Some(ct) = hit.record.content_type() {
                groups.entry(ct.key.as_str()).or_default().push(hit);
            }
        }
        groups
    }

    /// Matching records in rank order.
    pub fn records(&self) -> impl Iterator<Item = &ContentRecord> {
        self.hits.iter().map(|hit| &hit.record)
    }
}

/// Scope and narrowing of a search.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Content types to search; every searchable type when empty.
    pub content_types: Vec<String>,
    /// Extra field filters, as (content type identifier, field, filter).
    pub filters: Vec<(String, String, Filter)>,
    /// Overrides the configured published-only setting.
    pub published_only: Option<bool>,
    /// Overrides the configured per-type hit limit.
    pub limit_per_type: Option<u64>,
}

impl SearchOptions {
    /// Search everything searchable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the search to a content type. May be repeated.
    pub fn content_type(mut self, identifier: impl Into<String>) -> Self {
        self.content_types.push(identifier.into());
        self
    }

    /// Narrow hits of one content type by a field filter.
    pub fn filter(
        mut self,
        content_type: impl Into<String>,
        field: impl Into<String>,
        filter: impl Into<Filter>,
    ) -> Self {
        self.filters
            .push((content_type.into(), field.into(), filter.into()));
        self
    }

    /// Only return published records, or not.
    pub fn published_only(mut self, published_only: bool) -> Self {
        self.published_only = Some(published_only);
        self
    }

    /// Cap hits fetched from each content type.
    pub fn limit_per_type(mut self, limit: u64) -> Self {
        self.limit_per_type = Some(limit);
        self
    }
}

impl<C: Connection> Storage<C> {
    /// Search free text across content types.
    ///
    /// Fails with `InvalidSearchQuery` when the text holds no usable term.
    #[tracing::instrument(level = "debug", skip(self, options))]
    pub fn search(&self, text: &str, options: &SearchOptions) -> Result<SearchResult> {
        let query = SearchQuery::parse(text);
        if !query.valid {
            tracing::debug!(text, "Rejected search query without usable terms");
            return Err(Error::InvalidSearchQuery(text.to_string()));
        }

        let content_types: Vec<Arc<ContentType>> = if options.content_types.is_empty() {
            self.registry().searchable().cloned().collect()
        } else {
            options
                .content_types
                .iter()
                .map(|id| self.content_type(id))
                .collect::<Result<_>>()?
        };

        let mut filters: Vec<(String, &str, &Filter)> = Vec::with_capacity(options.filters.len());
        for (identifier, field, filter) in &options.filters {
            filters.push((self.content_type(identifier)?.key.clone(), field, filter));
        }

        let published_only = options
            .published_only
            .unwrap_or(self.config().search_published_only);
        let limit = options
            .limit_per_type
            .unwrap_or(self.config().search_limit_per_type);

        let mut hits = Vec::new();
        for ct in &content_types {
            let Some(terms) = term_predicate(ct, &query) else {
                continue;
            };

            let mut type_options = QueryOptions::new().limit(limit);
            for (_, field, filter) in filters.iter().filter(|(key, ..)| *key == ct.key) {
                type_options = type_options.filter(*field, (*filter).clone());
            }

            let mut plan = QueryPlan::build(ct, &type_options)?.and_where(ct, terms)?;
            if published_only {
                plan = plan.and_where(
                    ct,
                    Predicate::compare("status", Operator::Eq, Value::from("published")),
                )?;
            }

            for record in self.run_plan(ct, &plan)? {
                hits.push(SearchHit {
                    score: query.score(&record),
                    record,
                });
            }
        }

        hits.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.record.id().cmp(&a.record.id()))
        });

        tracing::info!(
            query = %query.sanitized,
            content_types = content_types.len(),
            hits = hits.len(),
            "Search complete"
        );
        Ok(SearchResult {
            no_of_results: hits.len(),
            query,
            hits,
        })
    }

    /// Apply the same field filters to every content type that has all the
    /// filtered fields, returning the matches in registration order.
    #[tracing::instrument(level = "debug", skip(self, filters))]
    pub fn search_all_content_types(&self, filters: &[(&str, Filter)]) -> Result<Vec<ContentRecord>> {
        let mut records = Vec::new();
        for ct in self.registry().iter() {
            if !filters.iter().all(|(field, _)| ct.has_field(field)) {
                continue;
            }
            let options = filters
                .iter()
                .fold(QueryOptions::new(), |options, (field, filter)| {
                    options.filter(*field, filter.clone())
                });
            let plan = QueryPlan::build(ct, &options)?;
            records.extend(self.run_plan(ct, &plan)?);
        }
        Ok(records)
    }
}

/// `AND` over required terms of `OR` over text fields of `LIKE %term%`.
fn term_predicate(ct: &ContentType, query: &SearchQuery) -> Option<Predicate> {
    let fields: Vec<&str> = ct.text_fields().map(|f| f.name.as_str()).collect();
    if fields.is_empty() {
        return None;
    }
    let per_term = query
        .required
        .iter()
        .map(|term| {
            Predicate::Or(
                fields
                    .iter()
                    .map(|field| {
                        Predicate::compare(*field, Operator::Like, Value::Text(format!("%{term}%")))
                    })
                    .collect(),
            )
        })
        .collect();
    Some(Predicate::And(per_term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConnection, registry};
    use contentstore_core::Row;

    fn storage() -> Storage<MockConnection> {
        Storage::new(MockConnection::new(), registry())
    }

    #[test]
    fn test_parse_drops_short_terms() {
        let query = SearchQuery::parse("I like lorem");
        assert_eq!(query.required, vec!["like", "lorem"]);
        assert_eq!(query.sanitized, "like lorem");
        assert!(query.valid);
    }

    #[test]
    fn test_only_stop_words_is_invalid() {
        let query = SearchQuery::parse("the and of");
        assert!(!query.valid);
        assert_eq!(query.optional.len(), 3);
    }

    #[test]
    fn test_invalid_query_is_an_error() {
        let storage = storage();
        assert!(matches!(
            storage.search("x", &SearchOptions::new()),
            Err(Error::InvalidSearchQuery(_))
        ));
        assert!(storage.connection().statements().is_empty());
    }

    #[test]
    fn test_search_plan_per_content_type() {
        let storage = storage();
        let result = storage.search("lorem", &SearchOptions::new()).unwrap();
        assert!(result.query.valid);
        assert_eq!(result.no_of_results, 0);

        let statements = storage.connection().statements();
        assert_eq!(statements.len(), 2);
        let (sql, params) = &statements[0];
        assert!(sql.starts_with("SELECT * FROM \"bolt_showcases\" WHERE "), "{sql}");
        assert!(sql.contains("\"title\" LIKE ?"));
        assert!(sql.contains("\"status\" = ?"));
        assert!(params.contains(&Value::from("%lorem%")));
        assert!(params.contains(&Value::from("published")));
    }

    #[test]
    fn test_filter_narrows_one_content_type() {
        let storage = storage();
        let options = SearchOptions::new()
            .content_type("showcases")
            .filter("showcases", "title", "nonexistent");
        let result = storage.search("lorem", &options).unwrap();

        assert!(result.query.valid);
        assert_eq!(result.no_of_results, 0);
        let (sql, params) = storage.connection().last();
        assert!(sql.contains("\"title\" = ?1"), "{sql}");
        assert_eq!(params[0], Value::from("nonexistent"));
    }

    #[test]
    fn test_ranking() {
        let storage = storage();
        storage.connection().push_rows(vec![
            Row::from_pairs([
                ("id", Value::BigInt(1)),
                ("title", Value::from("Lorem")),
                ("body", Value::from("lorem ipsum")),
            ]),
            Row::from_pairs([
                ("id", Value::BigInt(2)),
                ("title", Value::from("Other")),
                ("body", Value::from("some lorem")),
            ]),
            Row::from_pairs([
                ("id", Value::BigInt(3)),
                ("title", Value::from("Third")),
                ("body", Value::from("lorem again")),
            ]),
        ]);

        let result = storage
            .search("lorem", &SearchOptions::new().content_type("showcases"))
            .unwrap();
        let ids: Vec<Option<i64>> = result.records().map(ContentRecord::id).collect();
        assert_eq!(ids, vec![Some(1), Some(3), Some(2)]);
        assert_eq!(result.hits[0].score, 4);
        assert_eq!(result.grouped()["showcases"].len(), 3);
    }

    #[test]
    fn test_search_all_content_types() {
        let storage = storage();
        let records = storage
            .search_all_content_types(&[("title", Filter::contains("lorem"))])
            .unwrap();
        assert!(records.is_empty());
        assert_eq!(storage.connection().statements().len(), 2);

        storage
            .search_all_content_types(&[("teaser", Filter::contains("lorem"))])
            .unwrap();
        assert_eq!(storage.connection().statements().len(), 3);
    }
}
