//! Retailer repository for database operations.
//!
//! A retailer owns its addresses, attributes, tags, customer rates and
//! customer comments. Which of them are loaded with a retailer is decided by
//! a [`RetailerFetchPlan`]; associations are loaded with one query per
//! association for the whole result set.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use teco_core::{
    Code, CustomerId, MarketAreaId, RetailerAddressId, RetailerAssociation, RetailerAttributeId,
    RetailerCommentId, RetailerFetchPlan, RetailerId, RetailerRateId, RetailerTagId, Timestamped,
    Timestamps,
};

use super::{
    RepositoryError, StoreRepository, StoredStamps, conflict_on_unique, contains_pattern,
    normalize_code, sql_limit, stamp_now,
};
use crate::models::{
    MarketArea, Retailer, RetailerAddress, RetailerAttribute, RetailerCustomerComment,
    RetailerCustomerRate, RetailerTag,
};

const SELECT_RETAILER: &str = r"
    SELECT r.id, r.code, r.name, r.description, r.quality_of_service,
           r.ratio_quality_price, r.date_create, r.date_update
    FROM teco_retailer r
";

#[derive(sqlx::FromRow)]
struct RetailerRow {
    id: RetailerId,
    code: Code,
    name: String,
    description: Option<String>,
    quality_of_service: i32,
    ratio_quality_price: i32,
    date_create: DateTime<Utc>,
    date_update: DateTime<Utc>,
}

impl From<RetailerRow> for Retailer {
    fn from(row: RetailerRow) -> Self {
        Self {
            id: Some(row.id),
            code: Some(row.code),
            name: row.name,
            description: row.description,
            quality_of_service: row.quality_of_service,
            ratio_quality_price: row.ratio_quality_price,
            timestamps: Timestamps::loaded(row.date_create, row.date_update),
            ..Self::default()
        }
    }
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: RetailerAddressId,
    retailer_id: RetailerId,
    address1: String,
    address2: Option<String>,
    postal_code: Option<String>,
    city: String,
    country_code: String,
    is_default: bool,
    date_create: DateTime<Utc>,
    date_update: DateTime<Utc>,
}

impl From<AddressRow> for RetailerAddress {
    fn from(row: AddressRow) -> Self {
        Self {
            id: Some(row.id),
            address1: row.address1,
            address2: row.address2,
            postal_code: row.postal_code,
            city: row.city,
            country_code: row.country_code,
            is_default: row.is_default,
            timestamps: Timestamps::loaded(row.date_create, row.date_update),
        }
    }
}

#[derive(sqlx::FromRow)]
struct AttributeRow {
    id: RetailerAttributeId,
    retailer_id: RetailerId,
    attribute_code: String,
    value: Option<String>,
    localization_code: Option<String>,
    date_create: DateTime<Utc>,
    date_update: DateTime<Utc>,
}

impl From<AttributeRow> for RetailerAttribute {
    fn from(row: AttributeRow) -> Self {
        Self {
            id: Some(row.id),
            attribute_code: row.attribute_code,
            value: row.value,
            localization_code: row.localization_code,
            timestamps: Timestamps::loaded(row.date_create, row.date_update),
        }
    }
}

#[derive(sqlx::FromRow)]
struct TagRow {
    id: RetailerTagId,
    retailer_id: RetailerId,
    code: String,
    name: Option<String>,
    date_create: DateTime<Utc>,
    date_update: DateTime<Utc>,
}

impl From<TagRow> for RetailerTag {
    fn from(row: TagRow) -> Self {
        Self {
            id: Some(row.id),
            code: row.code,
            name: row.name,
            timestamps: Timestamps::loaded(row.date_create, row.date_update),
        }
    }
}

#[derive(sqlx::FromRow)]
struct RateRow {
    id: RetailerRateId,
    retailer_id: RetailerId,
    customer_id: CustomerId,
    rate: i32,
    date_create: DateTime<Utc>,
    date_update: DateTime<Utc>,
}

impl From<RateRow> for RetailerCustomerRate {
    fn from(row: RateRow) -> Self {
        Self {
            id: Some(row.id),
            retailer_id: Some(row.retailer_id),
            customer_id: row.customer_id,
            rate: row.rate,
            timestamps: Timestamps::loaded(row.date_create, row.date_update),
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: RetailerCommentId,
    retailer_id: RetailerId,
    customer_id: CustomerId,
    comment: String,
    date_create: DateTime<Utc>,
    date_update: DateTime<Utc>,
}

impl From<CommentRow> for RetailerCustomerComment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: Some(row.id),
            retailer_id: Some(row.retailer_id),
            customer_id: row.customer_id,
            comment: row.comment,
            timestamps: Timestamps::loaded(row.date_create, row.date_update),
        }
    }
}

#[derive(sqlx::FromRow)]
struct MarketAreaRow {
    id: MarketAreaId,
    code: Code,
    name: String,
}

/// Retailers loaded by one query, indexed for attaching associations.
struct Loaded {
    retailers: Vec<Retailer>,
    positions: HashMap<RetailerId, usize>,
}

impl Loaded {
    fn new(rows: Vec<RetailerRow>) -> Self {
        let retailers: Vec<Retailer> = rows.into_iter().map(Retailer::from).collect();
        let positions = retailers
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.id.map(|id| (id, i)))
            .collect();
        Self {
            retailers,
            positions,
        }
    }

    fn ids(&self) -> Vec<i64> {
        self.positions.keys().copied().map(i64::from).collect()
    }

    fn owner(&mut self, id: RetailerId) -> Option<&mut Retailer> {
        let index = *self.positions.get(&id)?;
        self.retailers.get_mut(index)
    }
}

/// Repository for retailer database operations.
pub struct RetailerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RetailerRepository<'a> {
    /// Create a new retailer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a retailer by its ID, loading associations per `plan` (default plan when `None`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_id(
        &self,
        id: RetailerId,
        plan: Option<&RetailerFetchPlan>,
    ) -> Result<Option<Retailer>, RepositoryError> {
        let row = sqlx::query_as::<_, RetailerRow>(&format!("{SELECT_RETAILER} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(self.load(row.into_iter().collect(), plan).await?.into_iter().next())
    }

    /// Get a retailer by its code, loading associations per `plan`.
    ///
    /// The code is trimmed before the lookup.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidArgument` if the code is blank.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_code(
        &self,
        code: &str,
        plan: Option<&RetailerFetchPlan>,
    ) -> Result<Option<Retailer>, RepositoryError> {
        let code = normalize_code(code)?;
        let row =
            sqlx::query_as::<_, RetailerRow>(&format!("{SELECT_RETAILER} WHERE r.code = $1"))
                .bind(&code)
                .fetch_optional(self.pool)
                .await?;

        Ok(self.load(row.into_iter().collect(), plan).await?.into_iter().next())
    }

    /// Highest retailer ID in use, or 0 when there are no retailers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn max_id(&self) -> Result<i64, RepositoryError> {
        let max = sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(id), 0) FROM teco_retailer")
            .fetch_one(self.pool)
            .await?;
        Ok(max)
    }

    /// All retailers ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_all(
        &self,
        plan: Option<&RetailerFetchPlan>,
    ) -> Result<Vec<Retailer>, RepositoryError> {
        let rows = sqlx::query_as::<_, RetailerRow>(&format!("{SELECT_RETAILER} ORDER BY r.code"))
            .fetch_all(self.pool)
            .await?;

        self.load(rows, plan).await
    }

    /// Retailers of a market area ordered by code, with the default plan.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no market area has this code.
    /// Returns `RepositoryError::InvalidArgument` if the code is blank.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_by_market_area_code(
        &self,
        market_area_code: &str,
    ) -> Result<Vec<Retailer>, RepositoryError> {
        let market_area_code = normalize_code(market_area_code)?;
        let market_area = self
            .get_market_area(&market_area_code)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let rows = sqlx::query_as::<_, RetailerRow>(&format!(
            "{SELECT_RETAILER} JOIN teco_market_area_retailer_rel rel ON rel.retailer_id = r.id \
             WHERE rel.market_area_id = $1 ORDER BY r.code"
        ))
        .bind(market_area.id)
        .fetch_all(self.pool)
        .await?;

        self.load(rows, None).await
    }

    /// Market area with the given code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_market_area(
        &self,
        code: &Code,
    ) -> Result<Option<MarketArea>, RepositoryError> {
        let row = sqlx::query_as::<_, MarketAreaRow>(
            "SELECT id, code, name FROM teco_market_area WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|row| MarketArea {
            id: row.id,
            code: row.code,
            name: row.name,
        }))
    }

    /// Retailers carrying at least one of the given tag codes, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_by_tags(
        &self,
        tags: &[String],
        plan: Option<&RetailerFetchPlan>,
    ) -> Result<Vec<Retailer>, RepositoryError> {
        let tags: Vec<&str> = tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, RetailerRow>(&format!(
            "{SELECT_RETAILER} WHERE r.id IN \
             (SELECT retailer_id FROM teco_retailer_tag WHERE code = ANY($1)) \
             ORDER BY r.name, r.id"
        ))
        .bind(&tags)
        .fetch_all(self.pool)
        .await?;

        self.load(rows, plan).await
    }

    /// Most recently created retailers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_last(
        &self,
        limit: usize,
        plan: Option<&RetailerFetchPlan>,
    ) -> Result<Vec<Retailer>, RepositoryError> {
        self.find_ordered("r.date_create DESC, r.id DESC", limit, plan)
            .await
    }

    /// Retailers with the best quality of service.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_best_by_quality_of_service(
        &self,
        limit: usize,
        plan: Option<&RetailerFetchPlan>,
    ) -> Result<Vec<Retailer>, RepositoryError> {
        self.find_ordered("r.quality_of_service DESC, r.id", limit, plan)
            .await
    }

    /// Retailers with the best quality/price ratio.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_best_by_quality_price(
        &self,
        limit: usize,
        plan: Option<&RetailerFetchPlan>,
    ) -> Result<Vec<Retailer>, RepositoryError> {
        self.find_ordered("r.ratio_quality_price DESC, r.id", limit, plan)
            .await
    }

    async fn find_ordered(
        &self,
        order_by: &'static str,
        limit: usize,
        plan: Option<&RetailerFetchPlan>,
    ) -> Result<Vec<Retailer>, RepositoryError> {
        let rows = sqlx::query_as::<_, RetailerRow>(&format!(
            "{SELECT_RETAILER} ORDER BY {order_by} LIMIT $1"
        ))
        .bind(sql_limit(limit))
        .fetch_all(self.pool)
        .await?;

        self.load(rows, plan).await
    }

    /// Retailers whose code, name or description contains `text`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_by_text(
        &self,
        text: &str,
        plan: Option<&RetailerFetchPlan>,
    ) -> Result<Vec<Retailer>, RepositoryError> {
        let rows = sqlx::query_as::<_, RetailerRow>(&format!(
            "{SELECT_RETAILER} WHERE r.code ILIKE $1 OR r.name ILIKE $1 OR r.description ILIKE $1 \
             ORDER BY r.id"
        ))
        .bind(contains_pattern(text.trim()))
        .fetch_all(self.pool)
        .await?;

        self.load(rows, plan).await
    }

    /// Insert or update a retailer together with the records it owns.
    ///
    /// Applies the timestamp policy to the retailer and every owned record,
    /// and generates a code when absent. Owned records without an ID are
    /// inserted, the others updated. Stores are saved through
    /// [`StoreRepository`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when updating a retailer, or an owned
    /// record, that does not exist or belongs to another retailer.
    /// Returns `RepositoryError::Conflict` if the code (or a tag code) is already used.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, retailer), fields(retailer_id = ?retailer.id))]
    pub async fn save(&self, mut retailer: Retailer) -> Result<Retailer, RepositoryError> {
        let now = stamp_now();
        let code = retailer.prepare_for_save(now);

        let mut tx = self.pool.begin().await?;

        let (id, stored) = if let Some(id) = retailer.id {
            let stored = sqlx::query_as::<_, StoredStamps>(
                r"
                UPDATE teco_retailer
                SET code = $2, name = $3, description = $4, quality_of_service = $5,
                    ratio_quality_price = $6, date_update = $7
                WHERE id = $1
                RETURNING date_create, date_update
                ",
            )
            .bind(id)
            .bind(&code)
            .bind(&retailer.name)
            .bind(&retailer.description)
            .bind(retailer.quality_of_service)
            .bind(retailer.ratio_quality_price)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| conflict_on_unique(e, "retailer code"))?
            .ok_or(RepositoryError::NotFound)?;
            (id, stored)
        } else {
            let (id, date_create, date_update) =
                sqlx::query_as::<_, (RetailerId, DateTime<Utc>, DateTime<Utc>)>(
                    r"
                    INSERT INTO teco_retailer (
                        code, name, description, quality_of_service, ratio_quality_price,
                        date_create, date_update
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING id, date_create, date_update
                    ",
                )
                .bind(&code)
                .bind(&retailer.name)
                .bind(&retailer.description)
                .bind(retailer.quality_of_service)
                .bind(retailer.ratio_quality_price)
                .bind(retailer.timestamps.created_or(now))
                .bind(now)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| conflict_on_unique(e, "retailer code"))?;
            (id, (date_create, date_update))
        };
        retailer.timestamps = Timestamps::loaded(stored.0, stored.1);

        save_addresses(&mut tx, id, &mut retailer.addresses, now).await?;
        save_attributes(&mut tx, id, &mut retailer.attributes, now).await?;
        save_tags(&mut tx, id, &mut retailer.tags, now).await?;
        for rate in &mut retailer.customer_rates {
            rate.retailer_id = Some(id);
            upsert_rate(&mut tx, rate, now).await?;
        }
        for comment in &mut retailer.customer_comments {
            comment.retailer_id = Some(id);
            upsert_comment(&mut tx, comment, now).await?;
        }

        tx.commit().await?;

        retailer.id = Some(id);
        debug!(retailer_id = %id, code = %code, "Retailer saved");
        Ok(retailer)
    }

    /// Delete a retailer; owned records and stores cascade.
    ///
    /// # Returns
    ///
    /// Returns `true` if the retailer was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: RetailerId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM teco_retailer WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert or update a customer rate on its own.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidArgument` if the rate has no retailer
    /// or lies outside 0..=5.
    /// Returns `RepositoryError::NotFound` when updating a rate that does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn save_customer_rate(
        &self,
        mut rate: RetailerCustomerRate,
    ) -> Result<RetailerCustomerRate, RepositoryError> {
        if !(0..=5).contains(&rate.rate) {
            return Err(RepositoryError::InvalidArgument(format!(
                "rate must be between 0 and 5, got {}",
                rate.rate
            )));
        }
        let now = stamp_now();
        rate.stamp(now);

        let mut conn = self.pool.acquire().await?;
        upsert_rate(&mut conn, &mut rate, now).await?;
        Ok(rate)
    }

    /// Delete a customer rate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_customer_rate(&self, id: RetailerRateId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM teco_retailer_customer_rate WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert or update a customer comment on its own.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidArgument` if the comment has no retailer.
    /// Returns `RepositoryError::NotFound` when updating a comment that does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn save_customer_comment(
        &self,
        mut comment: RetailerCustomerComment,
    ) -> Result<RetailerCustomerComment, RepositoryError> {
        let now = stamp_now();
        comment.stamp(now);

        let mut conn = self.pool.acquire().await?;
        upsert_comment(&mut conn, &mut comment, now).await?;
        Ok(comment)
    }

    /// Delete a customer comment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_customer_comment(
        &self,
        id: RetailerCommentId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM teco_retailer_customer_comment WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn load(
        &self,
        rows: Vec<RetailerRow>,
        plan: Option<&RetailerFetchPlan>,
    ) -> Result<Vec<Retailer>, RepositoryError> {
        let plan = RetailerFetchPlan::resolve(plan);
        let mut loaded = Loaded::new(rows);
        if loaded.retailers.is_empty() {
            return Ok(loaded.retailers);
        }
        let ids = loaded.ids();

        for association in plan.iter() {
            match association {
                RetailerAssociation::Addresses => {
                    let rows = sqlx::query_as::<_, AddressRow>(
                        r"
                        SELECT id, retailer_id, address1, address2, postal_code, city,
                               country_code, is_default, date_create, date_update
                        FROM teco_retailer_address
                        WHERE retailer_id = ANY($1)
                        ORDER BY id
                        ",
                    )
                    .bind(&ids)
                    .fetch_all(self.pool)
                    .await?;
                    for row in rows {
                        if let Some(retailer) = loaded.owner(row.retailer_id) {
                            retailer.addresses.push(row.into());
                        }
                    }
                }
                RetailerAssociation::Attributes => {
                    let rows = sqlx::query_as::<_, AttributeRow>(
                        r"
                        SELECT id, retailer_id, attribute_code, value, localization_code,
                               date_create, date_update
                        FROM teco_retailer_attribute
                        WHERE retailer_id = ANY($1)
                        ORDER BY id
                        ",
                    )
                    .bind(&ids)
                    .fetch_all(self.pool)
                    .await?;
                    for row in rows {
                        if let Some(retailer) = loaded.owner(row.retailer_id) {
                            retailer.attributes.push(row.into());
                        }
                    }
                }
                RetailerAssociation::Tags => {
                    let rows = sqlx::query_as::<_, TagRow>(
                        r"
                        SELECT id, retailer_id, code, name, date_create, date_update
                        FROM teco_retailer_tag
                        WHERE retailer_id = ANY($1)
                        ORDER BY code
                        ",
                    )
                    .bind(&ids)
                    .fetch_all(self.pool)
                    .await?;
                    for row in rows {
                        if let Some(retailer) = loaded.owner(row.retailer_id) {
                            retailer.tags.push(row.into());
                        }
                    }
                }
                RetailerAssociation::CustomerRates => {
                    let rows = sqlx::query_as::<_, RateRow>(
                        r"
                        SELECT id, retailer_id, customer_id, rate, date_create, date_update
                        FROM teco_retailer_customer_rate
                        WHERE retailer_id = ANY($1)
                        ORDER BY id
                        ",
                    )
                    .bind(&ids)
                    .fetch_all(self.pool)
                    .await?;
                    for row in rows {
                        if let Some(retailer) = loaded.owner(row.retailer_id) {
                            retailer.customer_rates.push(row.into());
                        }
                    }
                }
                RetailerAssociation::CustomerComments => {
                    let rows = sqlx::query_as::<_, CommentRow>(
                        r"
                        SELECT id, retailer_id, customer_id, comment, date_create, date_update
                        FROM teco_retailer_customer_comment
                        WHERE retailer_id = ANY($1)
                        ORDER BY id
                        ",
                    )
                    .bind(&ids)
                    .fetch_all(self.pool)
                    .await?;
                    for row in rows {
                        if let Some(retailer) = loaded.owner(row.retailer_id) {
                            retailer.customer_comments.push(row.into());
                        }
                    }
                }
                RetailerAssociation::Stores => {
                    let stores = StoreRepository::new(self.pool)
                        .find_by_retailer_ids(&ids)
                        .await?;
                    for store in stores {
                        let Some(owner_id) = store.retailer_id else {
                            continue;
                        };
                        if let Some(retailer) = loaded.owner(owner_id) {
                            retailer.stores.push(store);
                        }
                    }
                }
            }
        }

        for retailer in &mut loaded.retailers {
            retailer.fetch_plan = plan.clone();
        }
        Ok(loaded.retailers)
    }
}

async fn save_addresses(
    conn: &mut PgConnection,
    retailer_id: RetailerId,
    addresses: &mut [RetailerAddress],
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    for address in addresses {
        let (id, stored) = if let Some(id) = address.id {
            let stored = sqlx::query_as::<_, StoredStamps>(
                r"
                UPDATE teco_retailer_address
                SET address1 = $3, address2 = $4, postal_code = $5, city = $6,
                    country_code = $7, is_default = $8, date_update = $9
                WHERE id = $1 AND retailer_id = $2
                RETURNING date_create, date_update
                ",
            )
            .bind(id)
            .bind(retailer_id)
            .bind(&address.address1)
            .bind(&address.address2)
            .bind(&address.postal_code)
            .bind(&address.city)
            .bind(&address.country_code)
            .bind(address.is_default)
            .bind(now)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(RepositoryError::NotFound)?;
            (id, stored)
        } else {
            let (id, date_create, date_update) = sqlx::query_as::<
                _,
                (RetailerAddressId, DateTime<Utc>, DateTime<Utc>),
            >(
                r"
                INSERT INTO teco_retailer_address (
                    retailer_id, address1, address2, postal_code, city, country_code,
                    is_default, date_create, date_update
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING id, date_create, date_update
                ",
            )
            .bind(retailer_id)
            .bind(&address.address1)
            .bind(&address.address2)
            .bind(&address.postal_code)
            .bind(&address.city)
            .bind(&address.country_code)
            .bind(address.is_default)
            .bind(address.timestamps.created_or(now))
            .bind(now)
            .fetch_one(&mut *conn)
            .await?;
            (id, (date_create, date_update))
        };
        address.id = Some(id);
        address.timestamps = Timestamps::loaded(stored.0, stored.1);
    }
    Ok(())
}

async fn save_attributes(
    conn: &mut PgConnection,
    retailer_id: RetailerId,
    attributes: &mut [RetailerAttribute],
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    for attribute in attributes {
        let (id, stored) = if let Some(id) = attribute.id {
            let stored = sqlx::query_as::<_, StoredStamps>(
                r"
                UPDATE teco_retailer_attribute
                SET attribute_code = $3, value = $4, localization_code = $5, date_update = $6
                WHERE id = $1 AND retailer_id = $2
                RETURNING date_create, date_update
                ",
            )
            .bind(id)
            .bind(retailer_id)
            .bind(&attribute.attribute_code)
            .bind(&attribute.value)
            .bind(&attribute.localization_code)
            .bind(now)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(RepositoryError::NotFound)?;
            (id, stored)
        } else {
            let (id, date_create, date_update) = sqlx::query_as::<
                _,
                (RetailerAttributeId, DateTime<Utc>, DateTime<Utc>),
            >(
                r"
                INSERT INTO teco_retailer_attribute (
                    retailer_id, attribute_code, value, localization_code, date_create, date_update
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, date_create, date_update
                ",
            )
            .bind(retailer_id)
            .bind(&attribute.attribute_code)
            .bind(&attribute.value)
            .bind(&attribute.localization_code)
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

async fn save_tags(
    conn: &mut PgConnection,
    retailer_id: RetailerId,
    tags: &mut [RetailerTag],
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    for tag in tags {
        let (id, stored) = if let Some(id) = tag.id {
            let stored = sqlx::query_as::<_, StoredStamps>(
                r"
                UPDATE teco_retailer_tag
                SET code = $3, name = $4, date_update = $5
                WHERE id = $1 AND retailer_id = $2
                RETURNING date_create, date_update
                ",
            )
            .bind(id)
            .bind(retailer_id)
            .bind(&tag.code)
            .bind(&tag.name)
            .bind(now)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| conflict_on_unique(e, "retailer tag"))?
            .ok_or(RepositoryError::NotFound)?;
            (id, stored)
        } else {
            let (id, date_create, date_update) =
                sqlx::query_as::<_, (RetailerTagId, DateTime<Utc>, DateTime<Utc>)>(
                    r"
                    INSERT INTO teco_retailer_tag (retailer_id, code, name, date_create, date_update)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id, date_create, date_update
                    ",
                )
                .bind(retailer_id)
                .bind(&tag.code)
                .bind(&tag.name)
                .bind(tag.timestamps.created_or(now))
                .bind(now)
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| conflict_on_unique(e, "retailer tag"))?;
            (id, (date_create, date_update))
        };
        tag.id = Some(id);
        tag.timestamps = Timestamps::loaded(stored.0, stored.1);
    }
    Ok(())
}

async fn upsert_rate(
    conn: &mut PgConnection,
    rate: &mut RetailerCustomerRate,
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    let retailer_id = rate
        .retailer_id
        .ok_or_else(|| RepositoryError::InvalidArgument("rate has no retailer".to_string()))?;

    let (id, stored) = if let Some(id) = rate.id {
        let stored = sqlx::query_as::<_, StoredStamps>(
            r"
            UPDATE teco_retailer_customer_rate
            SET retailer_id = $2, customer_id = $3, rate = $4, date_update = $5
            WHERE id = $1
            RETURNING date_create, date_update
            ",
        )
        .bind(id)
        .bind(retailer_id)
        .bind(rate.customer_id)
        .bind(rate.rate)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        (id, stored)
    } else {
        let (id, date_create, date_update) =
            sqlx::query_as::<_, (RetailerRateId, DateTime<Utc>, DateTime<Utc>)>(
                r"
                INSERT INTO teco_retailer_customer_rate (
                    retailer_id, customer_id, rate, date_create, date_update
                )
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, date_create, date_update
                ",
            )
            .bind(retailer_id)
            .bind(rate.customer_id)
            .bind(rate.rate)
            .bind(rate.timestamps.created_or(now))
            .bind(now)
            .fetch_one(&mut *conn)
            .await?;
        (id, (date_create, date_update))
    };
    rate.id = Some(id);
    rate.timestamps = Timestamps::loaded(stored.0, stored.1);
    Ok(())
}

async fn upsert_comment(
    conn: &mut PgConnection,
    comment: &mut RetailerCustomerComment,
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    let retailer_id = comment
        .retailer_id
        .ok_or_else(|| RepositoryError::InvalidArgument("comment has no retailer".to_string()))?;

    let (id, stored) = if let Some(id) = comment.id {
        let stored = sqlx::query_as::<_, StoredStamps>(
            r"
            UPDATE teco_retailer_customer_comment
            SET retailer_id = $2, customer_id = $3, comment = $4, date_update = $5
            WHERE id = $1
            RETURNING date_create, date_update
            ",
        )
        .bind(id)
        .bind(retailer_id)
        .bind(comment.customer_id)
        .bind(&comment.comment)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        (id, stored)
    } else {
        let (id, date_create, date_update) =
            sqlx::query_as::<_, (RetailerCommentId, DateTime<Utc>, DateTime<Utc>)>(
                r"
                INSERT INTO teco_retailer_customer_comment (
                    retailer_id, customer_id, comment, date_create, date_update
                )
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, date_create, date_update
                ",
            )
            .bind(retailer_id)
            .bind(comment.customer_id)
            .bind(&comment.comment)
            .bind(comment.timestamps.created_or(now))
            .bind(now)
            .fetch_one(&mut *conn)
            .await?;
        (id, (date_create, date_update))
    };
    comment.id = Some(id);
    comment.timestamps = Timestamps::loaded(stored.0, stored.1);
    Ok(())
}
