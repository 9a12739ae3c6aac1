//! Store route handlers: lookup, store locator and store search.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use teco_core::{Distance, GeoPoint};

use super::retailers::split_list;
use crate::db::StoreRepository;
use crate::error::{AppError, Result};
use crate::models::{GeolocatedStore, Store};
use crate::search::StoreSearchResponse;
use crate::state::AppState;

/// Search radius in miles when `distance` is not given.
pub const DEFAULT_NEAR_DISTANCE_MILES: f64 = 10.0;

/// Number of stores returned by the locator when `max` is not given.
pub const DEFAULT_NEAR_MAX_RESULTS: usize = 20;

/// Store locator query parameters.
///
/// Coordinates are taken as text so malformed values are reported as
/// location errors rather than extractor rejections.
#[derive(Debug, Default, Deserialize)]
pub struct NearQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub distance: Option<String>,
    pub max: Option<usize>,
    pub country: Option<String>,
}

/// Store search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Field to search on; every store is returned when absent.
    pub by: Option<String>,
    #[serde(default)]
    pub text: String,
    /// Comma-separated facet fields.
    pub facets: Option<String>,
    /// Comma-separated cities.
    pub cities: Option<String>,
    /// Comma-separated country codes.
    pub countries: Option<String>,
}

/// Get a store by code.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(code): Path<String>) -> Result<Json<Store>> {
    StoreRepository::new(state.pool())
        .get_by_code(&code, None)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("store {code}")))
}

/// Stores around a point, nearest first.
#[instrument(skip(state))]
pub async fn near(
    State(state): State<AppState>,
    Query(query): Query<NearQuery>,
) -> Result<Json<Vec<GeolocatedStore>>> {
    let (Some(lat), Some(lng)) = (query.lat.as_deref(), query.lng.as_deref()) else {
        return Err(AppError::BadRequest("lat and lng are required".to_string()));
    };
    let origin = GeoPoint::parse(lat, lng)?;
    let distance = match query.distance.as_deref() {
        Some(distance) => Distance::parse(distance)?,
        None => Distance::miles(DEFAULT_NEAR_DISTANCE_MILES)?,
    };
    let max = query.max.unwrap_or(DEFAULT_NEAR_MAX_RESULTS);

    let repo = StoreRepository::new(state.pool());
    let stores = match query.country.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(country) => {
            repo.find_by_geoloc_and_country(country, origin, distance, max)
                .await?
        }
        None => repo.find_by_geoloc(origin, distance, max).await?,
    };

    Ok(Json(stores))
}

/// Search the store index.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<StoreSearchResponse>> {
    let Some(by) = query.by.as_deref() else {
        return Ok(Json(state.search().search_all()?));
    };

    let response = state.search().search_store(
        by,
        &query.text,
        &split_list(query.facets.as_deref()),
        &split_list(query.cities.as_deref()),
        &split_list(query.countries.as_deref()),
    )?;
    Ok(Json(response))
}
