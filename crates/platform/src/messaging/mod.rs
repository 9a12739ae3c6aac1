//! Cache management messaging.
//!
//! The platform does not run a broker. It posts [`CacheManagementMessage`]s
//! to an external broker queue consumed by the cache servers, and every send
//! reports back a [`MessageReceipt`] or a [`ProducerError`].

mod error;
mod producer;
mod types;

pub use error::ProducerError;
pub use producer::CacheManagementProducer;
pub use types::{CacheManagementMessage, MessageReceipt};
