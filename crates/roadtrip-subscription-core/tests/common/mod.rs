//! Common test utilities for roadtrip-subscription-core integration tests

pub mod fixtures;
pub mod tracking_store;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use tracking_store::TrackingStore;
