//! Store search using Tantivy.
//!
//! Every store is indexed with its code, name, city, country code, postal
//! code and type. Each of these is stored for display and indexed a second
//! time, lowercased and untokenized, so searches are case-insensitive prefix
//! matches on the whole value.
//!
//! The index lives in RAM or in a directory. The database stays the source
//! of truth: [`reindex_all`] rebuilds the index from the `teco_store` table.

mod indexer;

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tantivy::collector::DocSetCollector;
use tantivy::directory::MmapDirectory;
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, RegexQuery, TermQuery};
use tantivy::schema::{
    Field, INDEXED, IndexRecordOption, STORED, STRING, Schema, TantivyDocument, Value,
};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Term};
use tracing::{debug, instrument};

use teco_core::{Code, StoreId};

use crate::models::Store;

pub use indexer::{build_index_async, reindex_all};

/// Maximum number of stores returned by [`StoreSearchIndex::search_store`].
pub const DEFAULT_ROWS: usize = 20;

/// Values with fewer matching stores are left out of facets.
pub const FACET_MIN_COUNT: usize = 1;

/// Maximum number of values per facet.
pub const FACET_LIMIT: usize = 30;

/// Maximum number of values of the name facet returned by [`StoreSearchIndex::search_all`].
pub const SEARCH_ALL_FACET_LIMIT: usize = 8;

const WRITER_MEMORY_BUDGET: usize = 50_000_000;

/// Searchable store fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreField {
    Id,
    Code,
    Name,
    City,
    CountryCode,
    PostalCode,
    Type,
}

impl StoreField {
    /// All fields, in index order.
    pub const ALL: [Self; 7] = [
        Self::Id,
        Self::Code,
        Self::Name,
        Self::City,
        Self::CountryCode,
        Self::PostalCode,
        Self::Type,
    ];

    /// Field name as used by callers and in the index schema.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Code => "code",
            Self::Name => "name",
            Self::City => "city",
            Self::CountryCode => "countrycode",
            Self::PostalCode => "postalcode",
            Self::Type => "type",
        }
    }

    /// Parse a field name, ignoring case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::UnknownField` if no field has this name.
    pub fn parse(s: &str) -> Result<Self, SearchError> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == name)
            .ok_or_else(|| SearchError::UnknownField(s.trim().to_string()))
    }
}

/// A store as returned by the search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    pub id: StoreId,
    pub code: Option<String>,
    pub name: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
    pub postal_code: Option<String>,
    #[serde(rename = "type")]
    pub store_type: Option<String>,
}

impl StoreDocument {
    /// The display value of a field.
    #[must_use]
    pub fn value(&self, field: StoreField) -> Option<String> {
        match field {
            StoreField::Id => Some(self.id.to_string()),
            StoreField::Code => self.code.clone(),
            StoreField::Name => self.name.clone(),
            StoreField::City => self.city.clone(),
            StoreField::CountryCode => self.country_code.clone(),
            StoreField::PostalCode => self.postal_code.clone(),
            StoreField::Type => self.store_type.clone(),
        }
    }
}

/// Number of matching stores sharing a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
    pub value: String,
    pub count: usize,
}

/// Per-value counts of a field over all matching stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetField {
    pub field: StoreField,
    pub values: Vec<FacetCount>,
}

/// Result of a store search.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSearchResponse {
    /// Number of matching stores, before the row limit.
    pub num_found: usize,
    /// Matching stores ordered by id.
    pub stores: Vec<StoreDocument>,
    pub facets: Vec<FacetField>,
}

impl StoreSearchResponse {
    /// Facet for a field, if it was requested.
    #[must_use]
    pub fn facet(&self, field: StoreField) -> Option<&FacetField> {
        self.facets.iter().find(|facet| facet.field == field)
    }
}

/// A text field stored for display and indexed lowercased for matching.
#[derive(Clone, Copy)]
struct TextField {
    stored: Field,
    key: Field,
}

/// Schema field handles for the store index.
#[derive(Clone, Copy)]
struct StoreFields {
    id: Field,
    id_key: Field,
    code: TextField,
    name: TextField,
    city: TextField,
    country_code: TextField,
    postal_code: TextField,
    store_type: TextField,
}

impl StoreFields {
    fn key(&self, field: StoreField) -> Field {
        match field {
            StoreField::Id => self.id_key,
            StoreField::Code => self.code.key,
            StoreField::Name => self.name.key,
            StoreField::City => self.city.key,
            StoreField::CountryCode => self.country_code.key,
            StoreField::PostalCode => self.postal_code.key,
            StoreField::Type => self.store_type.key,
        }
    }
}

struct IndexInner {
    #[allow(dead_code)]
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    fields: StoreFields,
}

/// The store search index.
///
/// Cloning is cheap; clones share the same index and writer.
#[derive(Clone)]
pub struct StoreSearchIndex {
    inner: Arc<IndexInner>,
}

impl StoreSearchIndex {
    /// Create an empty index held in memory.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Index` if the writer or reader cannot be created.
    pub fn in_memory() -> Result<Self, SearchError> {
        let (schema, fields) = Self::build_schema();
        Self::from_index(Index::create_in_ram(schema), fields)
    }

    /// Open the index stored in `dir`, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Index` if the directory cannot be used or holds an
    /// index with a different schema.
    pub fn open_in_dir(dir: &Path) -> Result<Self, SearchError> {
        std::fs::create_dir_all(dir).map_err(|e| {
            SearchError::Index(format!("Failed to create {}: {e}", dir.display()))
        })?;
        let directory = MmapDirectory::open(dir)
            .map_err(|e| SearchError::Index(format!("Failed to open {}: {e}", dir.display())))?;

        let (schema, fields) = Self::build_schema();
        let index = Index::open_or_create(directory, schema)
            .map_err(|e| SearchError::Index(format!("Failed to open index: {e}")))?;
        Self::from_index(index, fields)
    }

    fn from_index(index: Index, fields: StoreFields) -> Result<Self, SearchError> {
        let writer = index
            .writer(WRITER_MEMORY_BUDGET)
            .map_err(|e| SearchError::Index(format!("Failed to create writer: {e}")))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::Index(format!("Failed to create reader: {e}")))?;

        Ok(Self {
            inner: Arc::new(IndexInner {
                index,
                reader,
                writer: Mutex::new(writer),
                fields,
            }),
        })
    }

    /// Build the schema for the store index.
    fn build_schema() -> (Schema, StoreFields) {
        let mut schema_builder = Schema::builder();

        let id = schema_builder.add_i64_field("id", INDEXED | STORED);
        // STRING means indexed but not tokenized (exact and prefix match)
        let id_key = schema_builder.add_text_field("id_key", STRING);

        let mut text_field = |name: &str| TextField {
            stored: schema_builder.add_text_field(name, STORED),
            key: schema_builder.add_text_field(&format!("{name}_key"), STRING),
        };
        let code = text_field("code");
        let name = text_field("name");
        let city = text_field("city");
        let country_code = text_field("countrycode");
        let postal_code = text_field("postalcode");
        let store_type = text_field("type");

        let fields = StoreFields {
            id,
            id_key,
            code,
            name,
            city,
            country_code,
            postal_code,
            store_type,
        };
        (schema_builder.build(), fields)
    }

    /// Index a store, replacing any document with the same id, and commit.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidArgument` if the store has not been saved.
    /// Returns `SearchError::Index` if writing or committing fails.
    #[instrument(skip(self, store), fields(store_id = ?store.id))]
    pub fn add_or_update_store(&self, store: &Store) -> Result<(), SearchError> {
        let doc = self.to_document(store)?;
        let id = store_id(store)?;

        let mut writer = self.lock_writer()?;
        writer.delete_term(Term::from_field_i64(self.inner.fields.id, id.as_i64()));
        writer
            .add_document(doc)
            .map_err(|e| SearchError::Index(format!("Failed to add document: {e}")))?;
        Self::commit(&mut writer)?;
        drop(writer);

        self.reload()
    }

    /// Remove a store from the index and commit.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Index` if committing fails.
    pub fn remove_store(&self, id: StoreId) -> Result<(), SearchError> {
        let mut writer = self.lock_writer()?;
        writer.delete_term(Term::from_field_i64(self.inner.fields.id, id.as_i64()));
        Self::commit(&mut writer)?;
        drop(writer);

        self.reload()
    }

    /// Replace the whole index content with `stores` in a single commit.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidArgument` if a store has not been saved;
    /// nothing is committed in that case.
    /// Returns `SearchError::Index` if writing or committing fails.
    pub fn replace_all(&self, stores: &[Store]) -> Result<usize, SearchError> {
        let docs = stores
            .iter()
            .map(|store| self.to_document(store))
            .collect::<Result<Vec<_>, _>>()?;
        let count = docs.len();

        let mut writer = self.lock_writer()?;
        writer
            .delete_all_documents()
            .map_err(|e| SearchError::Index(format!("Failed to clear index: {e}")))?;
        for doc in docs {
            writer
                .add_document(doc)
                .map_err(|e| SearchError::Index(format!("Failed to add document: {e}")))?;
        }
        Self::commit(&mut writer)?;
        drop(writer);

        self.reload()?;
        Ok(count)
    }

    /// Search stores by a case-insensitive prefix of one field.
    ///
    /// An empty `search_text` matches every store that has a value for
    /// `search_by`. `cities` and `countries` restrict the result to stores in
    /// any of the given cities and countries. Facets are computed over all
    /// matching stores; at most [`DEFAULT_ROWS`] stores are returned.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidArgument` if `search_by` is blank.
    /// Returns `SearchError::UnknownField` if `search_by` or a facet field is unknown.
    /// Returns `SearchError::Query` if the search fails.
    #[instrument(skip(self))]
    pub fn search_store(
        &self,
        search_by: &str,
        search_text: &str,
        facet_fields: &[String],
        cities: &[String],
        countries: &[String],
    ) -> Result<StoreSearchResponse, SearchError> {
        if search_by.trim().is_empty() {
            return Err(SearchError::InvalidArgument(
                "search field is required".to_string(),
            ));
        }
        let field = StoreField::parse(search_by)?;
        let facets = facet_fields
            .iter()
            .filter(|name| !name.trim().is_empty())
            .map(|name| StoreField::parse(name))
            .collect::<Result<Vec<_>, _>>()?;

        let fields = &self.inner.fields;
        let text = search_text.trim().to_lowercase();
        let pattern = if text.is_empty() {
            ".*".to_string()
        } else {
            format!("{}.*", escape_regex(&text))
        };
        let field_query = RegexQuery::from_pattern(&pattern, fields.key(field))
            .map_err(|e| SearchError::Query(format!("Invalid search text: {e}")))?;

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, Box::new(field_query))];
        if let Some(filter) = any_of(fields.city.key, cities) {
            clauses.push((Occur::Must, filter));
        }
        if let Some(filter) = any_of(fields.country_code.key, countries) {
            clauses.push((Occur::Must, filter));
        }

        self.run(
            &BooleanQuery::new(clauses),
            &facets,
            FACET_LIMIT,
            DEFAULT_ROWS,
        )
    }

    /// Every store, with the most common store names as a facet.
    ///
    /// `num_found` counts every indexed store; at most [`DEFAULT_ROWS`] are
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Query` if the search fails.
    #[instrument(skip(self))]
    pub fn search_all(&self) -> Result<StoreSearchResponse, SearchError> {
        self.run(
            &AllQuery,
            &[StoreField::Name],
            SEARCH_ALL_FACET_LIMIT,
            DEFAULT_ROWS,
        )
    }

    /// Get the number of documents in the index.
    #[must_use]
    pub fn num_docs(&self) -> u64 {
        self.inner.reader.searcher().num_docs()
    }

    fn run(
        &self,
        query: &dyn Query,
        facets: &[StoreField],
        facet_limit: usize,
        rows: usize,
    ) -> Result<StoreSearchResponse, SearchError> {
        let searcher = self.inner.reader.searcher();
        let addresses = searcher
            .search(query, &DocSetCollector)
            .map_err(|e| SearchError::Query(format!("Search failed: {e}")))?;

        let mut stores = addresses
            .into_iter()
            .map(|address| {
                let doc = searcher
                    .doc::<TantivyDocument>(address)
                    .map_err(|e| SearchError::Query(format!("Failed to retrieve doc: {e}")))?;
                self.doc_to_store(&doc)
            })
            .collect::<Result<Vec<_>, _>>()?;
        stores.sort_by_key(|store| store.id);

        let facets = facets
            .iter()
            .map(|&field| facet_counts(field, &stores, facet_limit))
            .collect();
        let num_found = stores.len();
        stores.truncate(rows);

        debug!(num_found, returned = stores.len(), "Store search done");
        Ok(StoreSearchResponse {
            num_found,
            stores,
            facets,
        })
    }

    fn to_document(&self, store: &Store) -> Result<TantivyDocument, SearchError> {
        let id = store_id(store)?;
        let fields = &self.inner.fields;

        let mut doc = TantivyDocument::default();
        doc.add_i64(fields.id, id.as_i64());
        doc.add_text(fields.id_key, id.to_string());

        let values = [
            (fields.code, store.code.as_ref().map(Code::as_str)),
            (fields.name, Some(store.name.as_str())),
            (fields.city, store.city.as_deref()),
            (fields.country_code, store.country_code.as_deref()),
            (fields.postal_code, store.postal_code.as_deref()),
            (fields.store_type, store.store_type.as_deref()),
        ];
        for (field, value) in values {
            let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
                continue;
            };
            doc.add_text(field.stored, value);
            doc.add_text(field.key, value.to_lowercase());
        }
        Ok(doc)
    }

    fn doc_to_store(&self, doc: &TantivyDocument) -> Result<StoreDocument, SearchError> {
        let fields = &self.inner.fields;
        let get_text = |field: TextField| -> Option<String> {
            doc.get_first(field.stored)
                .and_then(|v| v.as_str())
                .map(ToString::to_string)
        };

        let id = doc
            .get_first(fields.id)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| SearchError::Query("Document without id".to_string()))?;

        Ok(StoreDocument {
            id: StoreId::new(id),
            code: get_text(fields.code),
            name: get_text(fields.name),
            city: get_text(fields.city),
            country_code: get_text(fields.country_code),
            postal_code: get_text(fields.postal_code),
            store_type: get_text(fields.store_type),
        })
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, IndexWriter>, SearchError> {
        self.inner
            .writer
            .lock()
            .map_err(|_| SearchError::Index("Lock poisoned".to_string()))
    }

    fn commit(writer: &mut IndexWriter) -> Result<(), SearchError> {
        writer
            .commit()
            .map_err(|e| SearchError::Index(format!("Failed to commit index: {e}")))?;
        Ok(())
    }

    fn reload(&self) -> Result<(), SearchError> {
        self.inner
            .reader
            .reload()
            .map_err(|e| SearchError::Index(format!("Failed to reload reader: {e}")))
    }
}

fn store_id(store: &Store) -> Result<StoreId, SearchError> {
    store
        .id
        .ok_or_else(|| SearchError::InvalidArgument("store has no id".to_string()))
}

/// Escape regex metacharacters so user input matches literally.
fn escape_regex(text: &str) -> String {
    text.chars()
        .flat_map(|c| match c {
            '.' | '*' | '+' | '?' | '^' | '$' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\' => {
                vec!['\\', c]
            }
            _ => vec![c],
        })
        .collect()
}

/// A query matching any of `values` on an untokenized key field.
fn any_of(key: Field, values: &[String]) -> Option<Box<dyn Query>> {
    let clauses: Vec<(Occur, Box<dyn Query>)> = values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .map(|v| {
            let term = Term::from_field_text(key, &v);
            (
                Occur::Should,
                Box::new(TermQuery::new(term, IndexRecordOption::Basic)) as Box<dyn Query>,
            )
        })
        .collect();

    if clauses.is_empty() {
        None
    } else {
        Some(Box::new(BooleanQuery::new(clauses)))
    }
}

/// Count the values of `field` over `stores`, most frequent first.
fn facet_counts(field: StoreField, stores: &[StoreDocument], limit: usize) -> FacetField {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in stores.iter().filter_map(|store| store.value(field)) {
        *counts.entry(value).or_default() += 1;
    }

    let mut values: Vec<FacetCount> = counts
        .into_iter()
        .filter(|&(_, count)| count >= FACET_MIN_COUNT)
        .map(|(value, count)| FacetCount { value, count })
        .collect();
    values.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    values.truncate(limit);

    FacetField { field, values }
}

/// Search errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Index error: {0}")]
    Index(String),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Build error: {0}")]
    Build(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unknown field: {0}")]
    UnknownField(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store(id: i64, code: &str, name: &str, city: &str, country: &str) -> Store {
        Store {
            id: Some(StoreId::new(id)),
            code: Some(Code::parse(code).unwrap()),
            city: Some(city.to_string()),
            country_code: Some(country.to_string()),
            ..Store::new(name)
        }
    }

    fn sample_index() -> StoreSearchIndex {
        let index = StoreSearchIndex::in_memory().unwrap();
        index
            .replace_all(&[
                store(3, "PAR-RIV", "Rivoli", "Paris", "FR"),
                store(1, "PAR-OPE", "Opera", "Paris", "FR"),
                store(2, "LYO-BEL", "Bellecour", "Lyon", "FR"),
                store(4, "LON-SOH", "Soho", "London", "GB"),
            ])
            .unwrap();
        index
    }

    #[test]
    fn test_store_field_parse() {
        assert_eq!(StoreField::parse("City").unwrap(), StoreField::City);
        assert_eq!(
            StoreField::parse(" countrycode ").unwrap(),
            StoreField::CountryCode
        );
        assert!(matches!(
            StoreField::parse("colour"),
            Err(SearchError::UnknownField(name)) if name == "colour"
        ));
    }

    #[test]
    fn test_escape_regex() {
        assert_eq!(escape_regex("a.b*"), "a\\.b\\*");
        assert_eq!(escape_regex("plain"), "plain");
    }

    #[test]
    fn test_facet_counts_order_and_limit() {
        let stores: Vec<StoreDocument> = ["Paris", "Lyon", "Paris", "Albi", "Lyon", "Paris"]
            .into_iter()
            .enumerate()
            .map(|(i, city)| StoreDocument {
                id: StoreId::new(i64::try_from(i).unwrap()),
                code: None,
                name: None,
                city: Some(city.to_string()),
                country_code: None,
                postal_code: None,
                store_type: None,
            })
            .collect();

        let facet = facet_counts(StoreField::City, &stores, 2);
        assert_eq!(facet.field, StoreField::City);
        assert_eq!(
            facet.values,
            vec![
                FacetCount {
                    value: "Paris".to_string(),
                    count: 3
                },
                FacetCount {
                    value: "Lyon".to_string(),
                    count: 2
                },
            ]
        );
    }

    #[test]
    fn test_prefix_search_is_case_insensitive_and_ordered_by_id() {
        let index = sample_index();
        let response = index.search_store("code", "par", &[], &[], &[]).unwrap();

        assert_eq!(response.num_found, 2);
        let ids: Vec<i64> = response.stores.iter().map(|s| s.id.as_i64()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(response.stores[0].name.as_deref(), Some("Opera"));
    }

    #[test]
    fn test_empty_text_matches_all_with_field() {
        let index = sample_index();
        let response = index.search_store("name", "", &[], &[], &[]).unwrap();
        assert_eq!(response.num_found, 4);

        // No store has a postal code
        let response = index.search_store("postalcode", "  ", &[], &[], &[]).unwrap();
        assert_eq!(response.num_found, 0);
    }

    #[test]
    fn test_city_and_country_filters() {
        let index = sample_index();
        let cities = vec!["lyon".to_string(), "LONDON".to_string()];
        let response = index.search_store("name", "", &[], &cities, &[]).unwrap();
        assert_eq!(response.num_found, 2);

        let countries = vec!["FR".to_string()];
        let response = index
            .search_store("name", "", &[], &cities, &countries)
            .unwrap();
        assert_eq!(response.num_found, 1);
        assert_eq!(response.stores[0].code.as_deref(), Some("LYO-BEL"));
    }

    #[test]
    fn test_facets_on_matching_stores() {
        let index = sample_index();
        let facets = vec!["city".to_string(), "countrycode".to_string()];
        let response = index.search_store("name", "", &facets, &[], &[]).unwrap();

        let city = response.facet(StoreField::City).unwrap();
        assert_eq!(city.values[0].value, "Paris");
        assert_eq!(city.values[0].count, 2);
        let country = response.facet(StoreField::CountryCode).unwrap();
        assert_eq!(country.values[0].value, "FR");
        assert_eq!(country.values[0].count, 3);
    }

    #[test]
    fn test_search_rejects_blank_and_unknown_fields() {
        let index = sample_index();
        assert!(matches!(
            index.search_store(" ", "x", &[], &[], &[]),
            Err(SearchError::InvalidArgument(_))
        ));
        assert!(matches!(
            index.search_store("colour", "x", &[], &[], &[]),
            Err(SearchError::UnknownField(_))
        ));
        assert!(matches!(
            index.search_store("name", "", &["colour".to_string()], &[], &[]),
            Err(SearchError::UnknownField(_))
        ));
    }

    #[test]
    fn test_regex_characters_match_literally() {
        let index = StoreSearchIndex::in_memory().unwrap();
        index
            .add_or_update_store(&store(1, "A.B", "Dots", "Paris", "FR"))
            .unwrap();
        index
            .add_or_update_store(&store(2, "AXB", "Letters", "Paris", "FR"))
            .unwrap();

        let response = index.search_store("code", "a.", &[], &[], &[]).unwrap();
        assert_eq!(response.num_found, 1);
        assert_eq!(response.stores[0].id, StoreId::new(1));
    }

    #[test]
    fn test_add_or_update_replaces_document() {
        let index = StoreSearchIndex::in_memory().unwrap();
        index
            .add_or_update_store(&store(1, "S1", "Before", "Paris", "FR"))
            .unwrap();
        index
            .add_or_update_store(&store(1, "S1", "After", "Paris", "FR"))
            .unwrap();

        assert_eq!(index.num_docs(), 1);
        let response = index.search_store("name", "", &[], &[], &[]).unwrap();
        assert_eq!(response.stores[0].name.as_deref(), Some("After"));
    }

    #[test]
    fn test_add_unsaved_store_is_rejected() {
        let index = StoreSearchIndex::in_memory().unwrap();
        assert!(matches!(
            index.add_or_update_store(&Store::new("Unsaved")),
            Err(SearchError::InvalidArgument(_))
        ));
        assert_eq!(index.num_docs(), 0);
    }

    #[test]
    fn test_remove_store() {
        let index = sample_index();
        index.remove_store(StoreId::new(2)).unwrap();

        assert_eq!(index.num_docs(), 3);
        let response = index.search_store("city", "lyon", &[], &[], &[]).unwrap();
        assert_eq!(response.num_found, 0);
    }

    #[test]
    fn test_search_returns_at_most_default_rows() {
        let index = StoreSearchIndex::in_memory().unwrap();
        let stores: Vec<Store> = (1..=25)
            .map(|i| store(i, &format!("S{i:02}"), "Same", "Paris", "FR"))
            .collect();
        index.replace_all(&stores).unwrap();

        let response = index.search_store("code", "s", &[], &[], &[]).unwrap();
        assert_eq!(response.num_found, 25);
        assert_eq!(response.stores.len(), DEFAULT_ROWS);
        assert_eq!(response.stores[0].id, StoreId::new(1));
    }

    #[test]
    fn test_search_all_facets_on_name() {
        let index = sample_index();
        let response = index.search_all().unwrap();

        assert_eq!(response.num_found, 4);
        assert_eq!(response.stores.len(), 4);
        let names = response.facet(StoreField::Name).unwrap();
        assert_eq!(names.values.len(), 4);
        assert_eq!(names.values[0].value, "Bellecour");
    }

    #[test]
    fn test_search_all_caps_rows_but_counts_everything() {
        let index = StoreSearchIndex::in_memory().unwrap();
        let stores: Vec<Store> = (1..=25)
            .map(|i| store(i, &format!("S{i:02}"), &format!("Store {i:02}"), "Paris", "FR"))
            .collect();
        index.replace_all(&stores).unwrap();

        let response = index.search_all().unwrap();
        assert_eq!(response.num_found, 25);
        assert_eq!(response.stores.len(), DEFAULT_ROWS);
        assert_eq!(response.stores[0].id, StoreId::new(1));
        assert_eq!(
            response.stores.last().map(|s| s.id),
            Some(StoreId::new(20))
        );

        let names = response.facet(StoreField::Name).unwrap();
        assert_eq!(names.values.len(), SEARCH_ALL_FACET_LIMIT);
    }

    #[test]
    fn test_open_in_dir_persists() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("stores");
        {
            let index = StoreSearchIndex::open_in_dir(&dir).unwrap();
            index
                .replace_all(&[store(1, "S1", "Persisted", "Paris", "FR")])
                .unwrap();
        }
        let reopened = StoreSearchIndex::open_in_dir(&dir).unwrap();
        assert_eq!(reopened.num_docs(), 1);
    }
}
