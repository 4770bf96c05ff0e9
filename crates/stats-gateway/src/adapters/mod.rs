//! Adapters between the gateway ports and the Event Store.

pub mod store;

pub use store::{BlockingStoreAdapter, StoreHandle};
