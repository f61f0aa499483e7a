//! Roadtrip Subscription Core - Subscription and entitlement engine
//!
//! Plan entitlements, subscription lifecycle, quota enforcement and atomic
//! account creation/deletion on top of a [`roadtrip_db::Store`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use roadtrip_db::{create_pool, PgStore};
//! use roadtrip_subscription_core::{EngineConfig, NewAccount, SubscriptionEngine};
//! use roadtrip_types::ResourceKind;
//!
//! let store = Arc::new(PgStore::new(create_pool(&database_url).await?));
//! let engine = SubscriptionEngine::new(store, EngineConfig::from_env()?);
//!
//! let account = engine.accounts().create_account(NewAccount::new("jane@example.com")).await?;
//! engine.quota().create_resource(account.user.id, ResourceKind::Trip, None).await?;
//! engine.subscriptions().change_plan(account.user.id, "premium", Some("card")).await?;
//! ```

pub mod account;
pub mod catalog;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod quota;
pub mod role;
pub mod service;
pub mod status;

pub use account::{Account, AccountCoordinator, DeletionReport, NewAccount};
pub use catalog::{default_features, EntitlementCatalog, FeatureChange, FeatureValue, PlanDiff};
pub use config::{ConfigError, DatabaseConfig, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use lifecycle::{AvailableFeatures, HistoryPage, HistoryQuery, SubscriptionManager};
pub use quota::QuotaGate;
pub use role::plan_to_role;
pub use service::SubscriptionEngine;
pub use status::{normalize_status, select_current};
