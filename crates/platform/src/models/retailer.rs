//! Retailer domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teco_core::timestamps::stamp_all;
use teco_core::{
    Code, CustomerId, MarketAreaId, RetailerAddressId, RetailerAttributeId, RetailerCommentId,
    RetailerFetchPlan, RetailerId, RetailerRateId, RetailerTagId, Timestamped, Timestamps,
};

use super::impl_timestamped;
use super::store::Store;

/// A retailer (tenant) together with the associations loaded by its fetch plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Retailer {
    pub id: Option<RetailerId>,
    /// Business code; generated on first save when absent.
    pub code: Option<Code>,
    pub name: String,
    pub description: Option<String>,
    pub quality_of_service: i32,
    pub ratio_quality_price: i32,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    pub addresses: Vec<RetailerAddress>,
    pub attributes: Vec<RetailerAttribute>,
    pub tags: Vec<RetailerTag>,
    pub customer_rates: Vec<RetailerCustomerRate>,
    pub customer_comments: Vec<RetailerCustomerComment>,
    pub stores: Vec<Store>,
    /// Associations that were loaded with this retailer.
    #[serde(skip)]
    pub fetch_plan: RetailerFetchPlan,
}

impl Retailer {
    /// A new, unsaved retailer.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Apply persistence bookkeeping before a save at `now`.
    ///
    /// Generates a code when absent and stamps the retailer and every owned
    /// record that will be written with it. Stores are saved through their
    /// own repository and are left untouched. Returns the code the retailer
    /// is saved under.
    pub fn prepare_for_save(&mut self, now: DateTime<Utc>) -> Code {
        stamp_all(self.addresses.iter_mut(), now);
        stamp_all(self.attributes.iter_mut(), now);
        stamp_all(self.tags.iter_mut(), now);
        stamp_all(self.customer_rates.iter_mut(), now);
        stamp_all(self.customer_comments.iter_mut(), now);

        self.stamp(now);
        self.code.get_or_insert_with(Code::generate).clone()
    }

    /// Lightweight reference to this retailer, if it has been saved.
    #[must_use]
    pub fn summary(&self) -> Option<RetailerSummary> {
        Some(RetailerSummary {
            id: self.id?,
            code: self.code.clone()?,
            name: self.name.clone(),
        })
    }
}

/// Reference to a retailer embedded in other records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailerSummary {
    pub id: RetailerId,
    pub code: Code,
    pub name: String,
}

/// A postal address of a retailer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailerAddress {
    pub id: Option<RetailerAddressId>,
    pub address1: String,
    pub address2: Option<String>,
    pub postal_code: Option<String>,
    pub city: String,
    pub country_code: String,
    pub is_default: bool,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// A free-form attribute of a retailer, optionally localized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailerAttribute {
    pub id: Option<RetailerAttributeId>,
    pub attribute_code: String,
    pub value: Option<String>,
    pub localization_code: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// A tag used to group retailers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailerTag {
    pub id: Option<RetailerTagId>,
    pub code: String,
    pub name: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// A customer's rating (0 to 5) of a retailer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailerCustomerRate {
    pub id: Option<RetailerRateId>,
    /// Owning retailer; implied when saved as part of a retailer.
    pub retailer_id: Option<RetailerId>,
    pub customer_id: CustomerId,
    pub rate: i32,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl RetailerCustomerRate {
    /// A new, unsaved rating.
    #[must_use]
    pub fn new(retailer_id: RetailerId, customer_id: CustomerId, rate: i32) -> Self {
        Self {
            id: None,
            retailer_id: Some(retailer_id),
            customer_id,
            rate,
            timestamps: Timestamps::default(),
        }
    }
}

/// A customer's comment on a retailer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailerCustomerComment {
    pub id: Option<RetailerCommentId>,
    /// Owning retailer; implied when saved as part of a retailer.
    pub retailer_id: Option<RetailerId>,
    pub customer_id: CustomerId,
    pub comment: String,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl RetailerCustomerComment {
    /// A new, unsaved comment.
    #[must_use]
    pub fn new(retailer_id: RetailerId, customer_id: CustomerId, comment: impl Into<String>) -> Self {
        Self {
            id: None,
            retailer_id: Some(retailer_id),
            customer_id,
            comment: comment.into(),
            timestamps: Timestamps::default(),
        }
    }
}

/// A market area grouping retailers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketArea {
    pub id: MarketAreaId,
    pub code: Code,
    pub name: String,
}

impl_timestamped!(
    Retailer,
    RetailerAddress,
    RetailerAttribute,
    RetailerTag,
    RetailerCustomerRate,
    RetailerCustomerComment,
);
