//! Roadtrip Types - Shared domain types
//!
//! This crate contains domain types used across the subscription engine:
//! - Users, roles and privileges
//! - Plans, feature sets and quota-limited resources
//! - Subscriptions and payment records

pub mod entitlement;
pub mod error;
pub mod payment;
pub mod plan;
pub mod resource;
pub mod subscription;
pub mod user;

pub use entitlement::*;
pub use error::*;
pub use payment::*;
pub use plan::*;
pub use resource::*;
pub use subscription::*;
pub use user::*;
