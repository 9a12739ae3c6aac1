//! Domain models for the platform.
//!
//! These types represent domain objects separate from database row types.
//! Unsaved records have `id: None`; their timestamps are filled in by the
//! repositories through [`teco_core::Timestamped::stamp`].

/// Implement [`teco_core::Timestamped`] for records holding a `timestamps` field.
macro_rules! impl_timestamped {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ::teco_core::Timestamped for $ty {
                fn timestamps(&self) -> &::teco_core::Timestamps {
                    &self.timestamps
                }

                fn timestamps_mut(&mut self) -> &mut ::teco_core::Timestamps {
                    &mut self.timestamps
                }
            }
        )+
    };
}

pub(crate) use impl_timestamped;

pub mod retailer;
pub mod store;

pub use retailer::{
    MarketArea, Retailer, RetailerAddress, RetailerAttribute, RetailerCustomerComment,
    RetailerCustomerRate, RetailerSummary, RetailerTag,
};
pub use store::{GeolocatedStore, Store, StoreAttribute};
