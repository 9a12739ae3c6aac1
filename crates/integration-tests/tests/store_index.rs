//! On-disk store index lifecycle.
//!
//! These tests only need a writable temporary directory.

use tempfile::TempDir;

use teco_core::{Code, StoreId};
use teco_platform::models::Store;
use teco_platform::search::{StoreField, StoreSearchIndex};

fn store(id: i64, code: &str, name: &str, city: &str, country: &str) -> Store {
    Store {
        id: Some(StoreId::new(id)),
        code: Some(Code::parse(code).expect("valid store code")),
        city: Some(city.to_string()),
        country_code: Some(country.to_string()),
        postal_code: Some(format!("{id:05}")),
        ..Store::new(name)
    }
}

fn fixtures() -> Vec<Store> {
    vec![
        store(1, "PAR-RIV", "Rivoli", "Paris", "FR"),
        store(2, "PAR-OPE", "Opera", "Paris", "FR"),
        store(3, "LYO-BEL", "Bellecour", "Lyon", "FR"),
        store(4, "BRU-GRA", "Grand Place", "Brussels", "BE"),
    ]
}

fn search(
    index: &StoreSearchIndex,
    by: &str,
    text: &str,
    countries: &[&str],
) -> Vec<String> {
    let countries: Vec<String> = countries.iter().map(ToString::to_string).collect();
    index
        .search_store(by, text, &[], &[], &countries)
        .expect("search should succeed")
        .stores
        .into_iter()
        .filter_map(|doc| doc.code)
        .collect()
}

#[test]
fn test_index_survives_reopen() {
    let dir = TempDir::new().expect("create temp dir");

    {
        let index = StoreSearchIndex::open_in_dir(dir.path()).expect("open index");
        assert_eq!(
            index.replace_all(&fixtures()).expect("index fixtures"),
            4
        );
    }

    let reopened = StoreSearchIndex::open_in_dir(dir.path()).expect("open index");
    assert_eq!(reopened.num_docs(), 4);
    assert_eq!(
        search(&reopened, "city", "par", &[]),
        vec!["PAR-RIV", "PAR-OPE"]
    );
}

#[test]
fn test_open_creates_missing_directory() {
    let dir = TempDir::new().expect("create temp dir");
    let nested = dir.path().join("stores").join("index");

    let index = StoreSearchIndex::open_in_dir(&nested).expect("open nested index");
    assert_eq!(index.num_docs(), 0);
    assert!(nested.is_dir());
}

#[test]
fn test_incremental_updates() {
    let dir = TempDir::new().expect("create temp dir");
    let index = StoreSearchIndex::open_in_dir(dir.path()).expect("open index");
    index.replace_all(&fixtures()).expect("index fixtures");

    // Renaming a store replaces its document instead of adding one
    let mut moved = store(3, "LYO-BEL", "Bellecour", "Villeurbanne", "FR");
    moved.name = "Bellecour II".to_string();
    index.add_or_update_store(&moved).expect("update store");
    assert_eq!(index.num_docs(), 4);
    assert!(search(&index, "city", "lyon", &[]).is_empty());
    assert_eq!(search(&index, "name", "bellecour ii", &[]), vec!["LYO-BEL"]);

    index.remove_store(StoreId::new(4)).expect("remove store");
    assert_eq!(index.num_docs(), 3);
    assert!(search(&index, "code", "BRU", &[]).is_empty());
}

#[test]
fn test_replace_all_drops_previous_content() {
    let dir = TempDir::new().expect("create temp dir");
    let index = StoreSearchIndex::open_in_dir(dir.path()).expect("open index");
    index.replace_all(&fixtures()).expect("index fixtures");

    index
        .replace_all(&[store(9, "AMS-DAM", "Dam", "Amsterdam", "NL")])
        .expect("replace index content");

    let all = index.search_all().expect("search all");
    assert_eq!(all.num_found, 1);
    assert_eq!(all.stores.first().and_then(|s| s.code.as_deref()), Some("AMS-DAM"));
}

#[test]
fn test_country_filter_and_facets() {
    let index = StoreSearchIndex::in_memory().expect("in-memory index");
    index.replace_all(&fixtures()).expect("index fixtures");

    assert_eq!(search(&index, "name", "", &["BE"]), vec!["BRU-GRA"]);

    let response = index
        .search_store("countrycode", "fr", &["city".to_string()], &[], &[])
        .expect("faceted search");
    assert_eq!(response.num_found, 3);

    let cities = response.facet(StoreField::City).expect("city facet");
    let paris = cities
        .values
        .iter()
        .find(|v| v.value == "Paris")
        .expect("Paris facet value");
    assert_eq!(paris.count, 2);
    assert!(cities.values.iter().all(|v| v.value != "Brussels"));
}
