//! Fetch plans: which associations to load alongside an aggregate.
//!
//! Repositories take an `Option<&FetchPlan<_>>`. `None` means the
//! association's default plan. The plan actually applied is kept on the
//! returned aggregate so callers can tell a missing association from one
//! that simply was not loaded.

use serde::{Deserialize, Serialize};

/// Associations of a retailer that can be loaded eagerly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetailerAssociation {
    Addresses,
    Attributes,
    Tags,
    CustomerRates,
    CustomerComments,
    Stores,
}

/// Associations of a store that can be loaded eagerly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreAssociation {
    Retailer,
    Attributes,
}

/// An ordered, duplicate-free set of associations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FetchPlan<A> {
    associations: Vec<A>,
}

/// Fetch plan for retailers.
pub type RetailerFetchPlan = FetchPlan<RetailerAssociation>;

/// Fetch plan for stores.
pub type StoreFetchPlan = FetchPlan<StoreAssociation>;

impl<A> Default for FetchPlan<A> {
    fn default() -> Self {
        Self {
            associations: Vec::new(),
        }
    }
}

impl<A: Copy + PartialEq> FetchPlan<A> {
    /// A plan that loads nothing but the record itself.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Add an association to the plan.
    #[must_use]
    pub fn with(mut self, association: A) -> Self {
        if !self.associations.contains(&association) {
            self.associations.push(association);
        }
        self
    }

    /// Whether the plan loads the given association.
    #[must_use]
    pub fn contains(&self, association: A) -> bool {
        self.associations.contains(&association)
    }

    /// Whether the plan loads nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.associations.is_empty()
    }

    /// Iterate over the associations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = A> + '_ {
        self.associations.iter().copied()
    }
}

impl<A: Copy + PartialEq> FromIterator<A> for FetchPlan<A> {
    fn from_iter<T: IntoIterator<Item = A>>(iter: T) -> Self {
        iter.into_iter().fold(Self::default(), Self::with)
    }
}

impl RetailerFetchPlan {
    /// Addresses, attributes and tags.
    #[must_use]
    pub fn default_retailer() -> Self {
        Self::none()
            .with(RetailerAssociation::Addresses)
            .with(RetailerAssociation::Attributes)
            .with(RetailerAssociation::Tags)
    }

    /// Resolve an optional caller plan against the retailer default.
    #[must_use]
    pub fn resolve(plan: Option<&Self>) -> Self {
        plan.cloned().unwrap_or_else(Self::default_retailer)
    }
}

impl StoreFetchPlan {
    /// Owning retailer and attributes.
    #[must_use]
    pub fn default_store() -> Self {
        Self::none()
            .with(StoreAssociation::Retailer)
            .with(StoreAssociation::Attributes)
    }

    /// Resolve an optional caller plan against the store default.
    #[must_use]
    pub fn resolve(plan: Option<&Self>) -> Self {
        plan.cloned().unwrap_or_else(Self::default_store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_deduplicates() {
        let plan = RetailerFetchPlan::none()
            .with(RetailerAssociation::Tags)
            .with(RetailerAssociation::Tags);
        assert_eq!(plan.iter().count(), 1);
    }

    #[test]
    fn test_default_retailer_plan() {
        let plan = RetailerFetchPlan::default_retailer();
        assert!(plan.contains(RetailerAssociation::Addresses));
        assert!(plan.contains(RetailerAssociation::Attributes));
        assert!(plan.contains(RetailerAssociation::Tags));
        assert!(!plan.contains(RetailerAssociation::Stores));
    }

    #[test]
    fn test_resolve_prefers_caller_plan() {
        let custom = RetailerFetchPlan::none().with(RetailerAssociation::Stores);
        assert_eq!(RetailerFetchPlan::resolve(Some(&custom)), custom);
        assert_eq!(
            RetailerFetchPlan::resolve(None),
            RetailerFetchPlan::default_retailer()
        );
    }

    #[test]
    fn test_explicit_empty_plan_is_respected() {
        let empty = StoreFetchPlan::none();
        assert!(StoreFetchPlan::resolve(Some(&empty)).is_empty());
        assert!(!StoreFetchPlan::resolve(None).is_empty());
    }

    #[test]
    fn test_from_iterator_keeps_order() {
        let plan: StoreFetchPlan = [StoreAssociation::Attributes, StoreAssociation::Retailer]
            .into_iter()
            .collect();
        assert_eq!(
            plan.iter().collect::<Vec<_>>(),
            vec![StoreAssociation::Attributes, StoreAssociation::Retailer]
        );
    }

    #[test]
    fn test_serializes_as_list() {
        let plan = StoreFetchPlan::default_store();
        let json = serde_json::to_string(&plan).unwrap_or_default();
        assert_eq!(json, r#"["retailer","attributes"]"#);
    }
}
