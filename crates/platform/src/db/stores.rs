//! Store repository for database operations.
//!
//! Queries are built at runtime with `sqlx::query_as` and mapped through
//! private row types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use teco_core::geo::MILES_PER_NAUTICAL_MINUTE;
use teco_core::{
    Code, Distance, GeoPoint, RetailerId, StoreAssociation, StoreAttributeId, StoreFetchPlan,
    StoreId, Timestamps,
};

use super::{
    RepositoryError, StoredStamps, conflict_on_unique, normalize_code, sql_limit, stamp_now,
};
use crate::models::{GeolocatedStore, RetailerSummary, Store, StoreAttribute};

const SELECT_STORE: &str = r"
    SELECT s.id, s.retailer_id, s.code, s.name, s.store_type, s.address1, s.address2,
           s.postal_code, s.city, s.country_code, s.latitude, s.longitude,
           s.date_create, s.date_update
    FROM teco_store s
";

/// Stores within a radius, nearest first.
///
/// `$1`/`$2` origin latitude/longitude, `$3` radius in miles, `$4` optional
/// country code, `$5` row limit, `$6` miles per degree of arc.
const SELECT_NEAR: &str = r"
    SELECT id, code, distance
    FROM (
        SELECT s.id, s.code,
               DEGREES(ACOS(LEAST(1.0, GREATEST(-1.0,
                   SIN(RADIANS($1)) * SIN(RADIANS(s.latitude))
                   + COS(RADIANS($1)) * COS(RADIANS(s.latitude)) * COS(RADIANS($2 - s.longitude))
               )))) * $6 AS distance
        FROM teco_store s
        WHERE s.latitude IS NOT NULL
          AND s.longitude IS NOT NULL
          AND ($4::TEXT IS NULL OR s.country_code = $4)
    ) located
    WHERE distance <= $3
    ORDER BY distance ASC, id ASC
    LIMIT $5
";

#[derive(sqlx::FromRow)]
struct StoreRow {
    id: StoreId,
    retailer_id: Option<RetailerId>,
    code: Code,
    name: String,
    store_type: Option<String>,
    address1: Option<String>,
    address2: Option<String>,
    postal_code: Option<String>,
    city: Option<String>,
    country_code: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    date_create: DateTime<Utc>,
    date_update: DateTime<Utc>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Self {
            id: Some(row.id),
            retailer_id: row.retailer_id,
            code: Some(row.code),
            name: row.name,
            store_type: row.store_type,
            address1: row.address1,
            address2: row.address2,
            postal_code: row.postal_code,
            city: row.city,
            country_code: row.country_code,
            latitude: row.latitude,
            longitude: row.longitude,
            timestamps: Timestamps::loaded(row.date_create, row.date_update),
            retailer: None,
            attributes: Vec::new(),
            fetch_plan: StoreFetchPlan::none(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct StoreAttributeRow {
    id: StoreAttributeId,
    store_id: StoreId,
    attribute_code: String,
    value: Option<String>,
    date_create: DateTime<Utc>,
    date_update: DateTime<Utc>,
}

impl From<StoreAttributeRow> for StoreAttribute {
    fn from(row: StoreAttributeRow) -> Self {
        Self {
            id: Some(row.id),
            attribute_code: row.attribute_code,
            value: row.value,
            timestamps: Timestamps::loaded(row.date_create, row.date_update),
        }
    }
}

#[derive(sqlx::FromRow)]
struct RetailerSummaryRow {
    id: RetailerId,
    code: Code,
    name: String,
}

#[derive(sqlx::FromRow)]
struct GeolocatedRow {
    id: StoreId,
    code: Code,
    distance: f64,
}

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a store by its ID, loading associations per `plan` (default plan when `None`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_id(
        &self,
        id: StoreId,
        plan: Option<&StoreFetchPlan>,
    ) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!("{SELECT_STORE} WHERE s.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        self.load_one(row, plan).await
    }

    /// Get a store by its code, loading associations per `plan`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidArgument` if the code is blank.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_code(
        &self,
        code: &str,
        plan: Option<&StoreFetchPlan>,
    ) -> Result<Option<Store>, RepositoryError> {
        let code = normalize_code(code)?;
        let row = sqlx::query_as::<_, StoreRow>(&format!("{SELECT_STORE} WHERE s.code = $1"))
            .bind(&code)
            .fetch_optional(self.pool)
            .await?;

        self.load_one(row, plan).await
    }

    /// Highest store ID in use, or 0 when there are no stores.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn max_id(&self) -> Result<i64, RepositoryError> {
        let max = sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(id), 0) FROM teco_store")
            .fetch_one(self.pool)
            .await?;
        Ok(max)
    }

    /// All stores ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_all(
        &self,
        plan: Option<&StoreFetchPlan>,
    ) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!("{SELECT_STORE} ORDER BY s.code"))
            .fetch_all(self.pool)
            .await?;

        self.load_many(rows, plan).await
    }

    /// Stores of a retailer ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_by_retailer_id(
        &self,
        retailer_id: RetailerId,
        plan: Option<&StoreFetchPlan>,
    ) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "{SELECT_STORE} WHERE s.retailer_id = $1 ORDER BY s.name"
        ))
        .bind(retailer_id)
        .fetch_all(self.pool)
        .await?;

        self.load_many(rows, plan).await
    }

    /// Stores of the retailer with the given code, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidArgument` if the code is blank.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_by_retailer_code(
        &self,
        retailer_code: &str,
        plan: Option<&StoreFetchPlan>,
    ) -> Result<Vec<Store>, RepositoryError> {
        let retailer_code = normalize_code(retailer_code)?;
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "{SELECT_STORE} JOIN teco_retailer r ON r.id = s.retailer_id \
             WHERE r.code = $1 ORDER BY s.name"
        ))
        .bind(&retailer_code)
        .fetch_all(self.pool)
        .await?;

        self.load_many(rows, plan).await
    }

    /// Stores within `distance` miles of `origin`, nearest first.
    ///
    /// Stores without coordinates are never returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn find_by_geoloc(
        &self,
        origin: GeoPoint,
        distance: Distance,
        max_results: usize,
    ) -> Result<Vec<GeolocatedStore>, RepositoryError> {
        self.find_near(None, origin, distance, max_results).await
    }

    /// Stores of a country within `distance` miles of `origin`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn find_by_geoloc_and_country(
        &self,
        country_code: &str,
        origin: GeoPoint,
        distance: Distance,
        max_results: usize,
    ) -> Result<Vec<GeolocatedStore>, RepositoryError> {
        self.find_near(Some(country_code.trim()), origin, distance, max_results)
            .await
    }

    async fn find_near(
        &self,
        country_code: Option<&str>,
        origin: GeoPoint,
        distance: Distance,
        max_results: usize,
    ) -> Result<Vec<GeolocatedStore>, RepositoryError> {
        let rows = sqlx::query_as::<_, GeolocatedRow>(SELECT_NEAR)
            .bind(origin.latitude())
            .bind(origin.longitude())
            .bind(distance.as_miles())
            .bind(country_code)
            .bind(sql_limit(max_results))
            .bind(60.0 * MILES_PER_NAUTICAL_MINUTE)
            .fetch_all(self.pool)
            .await?;

        debug!(count = rows.len(), "Geolocated stores found");

        Ok(rows
            .into_iter()
            .map(|row| GeolocatedStore {
                id: row.id,
                code: row.code,
                distance: row.distance,
            })
            .collect())
    }

    /// Insert or update a store and its attributes.
    ///
    /// Applies the timestamp policy and generates a code when absent.
    /// Coordinates are either both absent or a valid point.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidArgument` for a partial or out-of-range location.
    /// Returns `RepositoryError::NotFound` when updating a store, or one of its
    /// attributes, that does not exist.
    /// Returns `RepositoryError::Conflict` if the code is already used.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, store), fields(store_id = ?store.id))]
    pub async fn save(&self, mut store: Store) -> Result<Store, RepositoryError> {
        let has_coordinates = store.latitude.is_some() || store.longitude.is_some();
        if has_coordinates && store.location().is_none() {
            return Err(RepositoryError::InvalidArgument(
                "store coordinates must be a valid latitude/longitude pair".to_string(),
            ));
        }

        let now = stamp_now();
        let code = store.prepare_for_save(now);

        let mut tx = self.pool.begin().await?;

        let (id, stored) = if let Some(id) = store.id {
            let stored = sqlx::query_as::<_, StoredStamps>(
                r"
                UPDATE teco_store
                SET retailer_id = $2, code = $3, name = $4, store_type = $5,
                    address1 = $6, address2 = $7, postal_code = $8, city = $9,
                    country_code = $10, latitude = $11, longitude = $12, date_update = $13
                WHERE id = $1
                RETURNING date_create, date_update
                ",
            )
            .bind(id)
            .bind(store.retailer_id)
            .bind(&code)
            .bind(&store.name)
            .bind(&store.store_type)
            .bind(&store.address1)
            .bind(&store.address2)
            .bind(&store.postal_code)
            .bind(&store.city)
            .bind(&store.country_code)
            .bind(store.latitude)
            .bind(store.longitude)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| conflict_on_unique(e, "store code"))?
            .ok_or(RepositoryError::NotFound)?;
            (id, stored)
        } else {
            let (id, date_create, date_update) =
                sqlx::query_as::<_, (StoreId, DateTime<Utc>, DateTime<Utc>)>(
                    r"
                    INSERT INTO teco_store (
                        retailer_id, code, name, store_type, address1, address2, postal_code,
                        city, country_code, latitude, longitude, date_create, date_update
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                    RETURNING id, date_create, date_update
                    ",
                )
                .bind(store.retailer_id)
                .bind(&code)
                .bind(&store.name)
                .bind(&store.store_type)
                .bind(&store.address1)
                .bind(&store.address2)
                .bind(&store.postal_code)
                .bind(&store.city)
                .bind(&store.country_code)
                .bind(store.latitude)
                .bind(store.longitude)
                .bind(store.timestamps.created_or(now))
                .bind(now)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| conflict_on_unique(e, "store code"))?;
            (id, (date_create, date_update))
        };
        store.timestamps = Timestamps::loaded(stored.0, stored.1);

        save_attributes(&mut tx, id, &mut store.attributes, now).await?;
        tx.commit().await?;

        store.id = Some(id);
        debug!(store_id = %id, code = %code, "Store saved");
        Ok(store)
    }

    /// Delete a store (its attributes cascade).
    ///
    /// # Returns
    ///
    /// Returns `true` if the store was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: StoreId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM teco_store WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores of several retailers, without associations.
    pub(crate) async fn find_by_retailer_ids(
        &self,
        retailer_ids: &[i64],
    ) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "{SELECT_STORE} WHERE s.retailer_id = ANY($1) ORDER BY s.name"
        ))
        .bind(retailer_ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Store::from).collect())
    }

    async fn load_one(
        &self,
        row: Option<StoreRow>,
        plan: Option<&StoreFetchPlan>,
    ) -> Result<Option<Store>, RepositoryError> {
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.load_many(vec![row], plan).await?.into_iter().next())
    }

    async fn load_many(
        &self,
        rows: Vec<StoreRow>,
        plan: Option<&StoreFetchPlan>,
    ) -> Result<Vec<Store>, RepositoryError> {
        let plan = StoreFetchPlan::resolve(plan);
        let mut stores: Vec<Store> = rows.into_iter().map(Store::from).collect();
        if stores.is_empty() {
            return Ok(stores);
        }

        let positions: HashMap<StoreId, usize> = stores
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.id.map(|id| (id, i)))
            .collect();
        let store_ids: Vec<i64> = positions.keys().copied().map(i64::from).collect();

        for association in plan.iter() {
            match association {
                StoreAssociation::Retailer => {
                    let retailer_ids: Vec<i64> = stores
                        .iter()
                        .filter_map(|s| s.retailer_id)
                        .map(i64::from)
                        .collect();
                    if retailer_ids.is_empty() {
                        continue;
                    }
                    let rows = sqlx::query_as::<_, RetailerSummaryRow>(
                        "SELECT id, code, name FROM teco_retailer WHERE id = ANY($1)",
                    )
                    .bind(&retailer_ids)
                    .fetch_all(self.pool)
                    .await?;

                    let summaries: HashMap<RetailerId, RetailerSummary> = rows
                        .into_iter()
                        .map(|r| {
                            (
                                r.id,
                                RetailerSummary {
                                    id: r.id,
                                    code: r.code,
                                    name: r.name,
                                },
                            )
                        })
                        .collect();
                    for store in &mut stores {
                        store.retailer = store
                            .retailer_id
                            .and_then(|id| summaries.get(&id).cloned());
                    }
                }
                StoreAssociation::Attributes => {
                    let rows = sqlx::query_as::<_, StoreAttributeRow>(
                        r"
                        SELECT id, store_id, attribute_code, value, date_create, date_update
                        FROM teco_store_attribute
                        WHERE store_id = ANY($1)
                        ORDER BY id
                        ",
                    )
                    .bind(&store_ids)
                    .fetch_all(self.pool)
                    .await?;

                    for row in rows {
                        if let Some(store) = positions
                            .get(&row.store_id)
                            .and_then(|&i| stores.get_mut(i))
                        {
                            store.attributes.push(row.into());
                        }
                    }
                }
            }
        }

        for store in &mut stores {
            store.fetch_plan = plan.clone();
        }
        Ok(stores)
    }
}

async fn save_attributes(
    conn: &mut PgConnection,
    store_id: StoreId,
    attributes: &mut [StoreAttribute],
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    for attribute in attributes {
        let (id, stored) = if let Some(id) = attribute.id {
            let stored = sqlx::query_as::<_, StoredStamps>(
                r"
                UPDATE teco_store_attribute
                SET attribute_code = $3, value = $4, date_update = $5
                WHERE id = $1 AND store_id = $2
                RETURNING date_create, date_update
                ",
            )
            .bind(id)
            .bind(store_id)
            .bind(&attribute.attribute_code)
            .bind(&attribute.value)
            .bind(now)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(RepositoryError::NotFound)?;
            (id, stored)
        } else {
            let (id, date_create, date_update) =
                sqlx::query_as::<_, (StoreAttributeId, DateTime<Utc>, DateTime<Utc>)>(
                    r"
                    INSERT INTO teco_store_attribute (store_id, attribute_code, value, date_create, date_update)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id, date_create, date_update
                    ",
                )
                .bind(store_id)
                .bind(&attribute.attribute_code)
                .bind(&attribute.value)
                .bind(attribute.timestamps.created_or(now))
                .bind(now)
                .fetch_one(&mut *conn)
                .await?;
            (id, (date_create, date_update))
        };
        attribute.id = Some(id);
        attribute.timestamps = Timestamps::loaded(stored.0, stored.1);
    }
    Ok(())
}
