//! Store domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teco_core::timestamps::stamp_all;
use teco_core::{
    Code, GeoPoint, RetailerId, StoreAttributeId, StoreFetchPlan, StoreId, Timestamped,
    Timestamps,
};

use super::impl_timestamped;
use super::retailer::RetailerSummary;

/// A physical store location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: Option<StoreId>,
    pub retailer_id: Option<RetailerId>,
    /// Business code; generated on first save when absent.
    pub code: Option<Code>,
    pub name: String,
    #[serde(rename = "type")]
    pub store_type: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    /// Owning retailer, when loaded by the fetch plan.
    pub retailer: Option<RetailerSummary>,
    pub attributes: Vec<StoreAttribute>,
    /// Associations that were loaded with this store.
    #[serde(skip)]
    pub fetch_plan: StoreFetchPlan,
}

impl Store {
    /// A new, unsaved store.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Apply persistence bookkeeping before a save at `now`.
    ///
    /// Returns the code the store is saved under.
    pub fn prepare_for_save(&mut self, now: DateTime<Utc>) -> Code {
        stamp_all(self.attributes.iter_mut(), now);
        self.stamp(now);
        self.code.get_or_insert_with(Code::generate).clone()
    }

    /// The store's coordinates, when both are known and valid.
    #[must_use]
    pub fn location(&self) -> Option<GeoPoint> {
        GeoPoint::new(self.latitude?, self.longitude?).ok()
    }
}

/// A free-form attribute of a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreAttribute {
    pub id: Option<StoreAttributeId>,
    pub attribute_code: String,
    pub value: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// A store matched by a proximity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeolocatedStore {
    pub id: StoreId,
    pub code: Code,
    /// Distance from the search origin in statute miles.
    pub distance: f64,
}

impl_timestamped!(Store, StoreAttribute);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(seconds)
    }

    #[test]
    fn test_prepare_for_save_stamps_and_generates_code() {
        let mut store = Store::new("Rivoli");
        store.attributes.push(StoreAttribute {
            attribute_code: "parking".to_string(),
            ..StoreAttribute::default()
        });

        store.prepare_for_save(at(10));

        assert!(store.code.is_some());
        assert_eq!(store.timestamps.date_create, Some(at(10)));
        assert_eq!(
            store.attributes.first().unwrap().timestamps.date_update,
            Some(at(10))
        );
    }

    #[test]
    fn test_update_keeps_creation_date() {
        let mut store = Store::new("Rivoli");
        store.prepare_for_save(at(10));
        store.prepare_for_save(at(20));

        assert_eq!(store.timestamps.date_create, Some(at(10)));
        assert_eq!(store.timestamps.date_update, Some(at(20)));
    }

    #[test]
    fn test_location_requires_both_coordinates() {
        let mut store = Store::new("Somewhere");
        assert!(store.location().is_none());

        store.latitude = Some(48.86);
        assert!(store.location().is_none());

        store.longitude = Some(2.33);
        assert!(store.location().is_some());

        store.latitude = Some(123.0);
        assert!(store.location().is_none());
    }

    #[test]
    fn test_store_type_serializes_as_type() {
        let mut store = Store::new("Typed");
        store.store_type = Some("OUTLET".to_string());
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["type"], "OUTLET");
    }
}
