//! Retailer route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use teco_core::{RetailerFetchPlan, StoreFetchPlan};

use crate::db::{RetailerRepository, StoreRepository};
use crate::error::{AppError, Result};
use crate::models::{Retailer, Store};
use crate::state::AppState;

/// Default number of retailers returned by the ranked listings.
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// Upper bound on `limit` for the ranked listings.
pub const MAX_LIST_LIMIT: usize = 100;

/// Ranked retailer listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetailerSort {
    Last,
    QualityOfService,
    QualityPrice,
}

impl RetailerSort {
    /// Parse from URL parameter value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for unknown values.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "last" => Ok(Self::Last),
            "quality-of-service" => Ok(Self::QualityOfService),
            "quality-price" => Ok(Self::QualityPrice),
            other => Err(AppError::BadRequest(format!("unknown sort: {other}"))),
        }
    }
}

/// Retailer listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct RetailerListQuery {
    /// Free text matched against code, name and description.
    pub q: Option<String>,
    /// Comma-separated tag codes.
    pub tags: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<usize>,
}

/// Split a comma-separated parameter, dropping blank items.
pub(crate) fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// List retailers.
///
/// `q` takes precedence over `tags`, which takes precedence over `sort`.
/// Without any of them every retailer is returned, ordered by code.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<RetailerListQuery>,
) -> Result<Json<Vec<Retailer>>> {
    let repo = RetailerRepository::new(state.pool());
    let plan = RetailerFetchPlan::default_retailer();

    if let Some(text) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        return Ok(Json(repo.find_by_text(text, Some(&plan)).await?));
    }

    let tags = split_list(query.tags.as_deref());
    if !tags.is_empty() {
        return Ok(Json(repo.find_by_tags(&tags, Some(&plan)).await?));
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let retailers = match query.sort.as_deref().map(RetailerSort::parse).transpose()? {
        Some(RetailerSort::Last) => repo.find_last(limit, Some(&plan)).await?,
        Some(RetailerSort::QualityOfService) => {
            repo.find_best_by_quality_of_service(limit, Some(&plan))
                .await?
        }
        Some(RetailerSort::QualityPrice) => {
            repo.find_best_by_quality_price(limit, Some(&plan)).await?
        }
        None => repo.find_all(Some(&plan)).await?,
    };

    Ok(Json(retailers))
}

/// Get a retailer by code.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Retailer>> {
    RetailerRepository::new(state.pool())
        .get_by_code(&code, None)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("retailer {code}")))
}

/// List the stores of a retailer.
#[instrument(skip(state))]
pub async fn stores(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<Store>>> {
    let retailer = RetailerRepository::new(state.pool())
        .get_by_code(&code, Some(&RetailerFetchPlan::none()))
        .await?;
    if retailer.is_none() {
        return Err(AppError::NotFound(format!("retailer {code}")));
    }

    let stores = StoreRepository::new(state.pool())
        .find_by_retailer_code(&code, Some(&StoreFetchPlan::default_store()))
        .await?;
    Ok(Json(stores))
}

/// List the retailers of a market area.
#[instrument(skip(state))]
pub async fn by_market_area(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<Retailer>>> {
    let retailers = RetailerRepository::new(state.pool())
        .find_by_market_area_code(&code)
        .await?;
    Ok(Json(retailers))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parse() {
        assert_eq!(RetailerSort::parse("last").unwrap(), RetailerSort::Last);
        assert_eq!(
            RetailerSort::parse("quality-of-service").unwrap(),
            RetailerSort::QualityOfService
        );
        assert_eq!(
            RetailerSort::parse("quality-price").unwrap(),
            RetailerSort::QualityPrice
        );
        assert!(matches!(
            RetailerSort::parse("cheapest"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(Some("bakery, organic,,")),
            vec!["bakery".to_string(), "organic".to_string()]
        );
        assert!(split_list(None).is_empty());
        assert!(split_list(Some(" , ")).is_empty());
    }
}
