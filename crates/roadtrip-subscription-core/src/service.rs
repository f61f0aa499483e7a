//! Subscription engine - ties together the catalog, lifecycle manager,
//! quota gate and account coordinator over one store

use std::sync::Arc;

use roadtrip_db::Store;

use crate::{
    account::AccountCoordinator, catalog::EntitlementCatalog, config::EngineConfig,
    lifecycle::SubscriptionManager, quota::QuotaGate,
};

/// Subscription and entitlement engine
///
/// Provides unified access to:
/// - Plan entitlements and plan comparison
/// - Subscription lifecycle (change, cancel, reactivate, renew, payments)
/// - Quota checks and quota-guarded resource creation
/// - Account creation and deletion
pub struct SubscriptionEngine<S: Store> {
    catalog: Arc<EntitlementCatalog>,
    subscriptions: Arc<SubscriptionManager<S>>,
    quota: QuotaGate<S>,
    accounts: AccountCoordinator<S>,
}

impl<S: Store> SubscriptionEngine<S> {
    /// Create an engine with the standard catalog
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self::with_catalog(store, EntitlementCatalog::new(), config)
    }

    /// Create an engine with a custom catalog
    pub fn with_catalog(store: Arc<S>, catalog: EntitlementCatalog, config: EngineConfig) -> Self {
        let catalog = Arc::new(catalog);
        let subscriptions = Arc::new(SubscriptionManager::new(
            Arc::clone(&store),
            Arc::clone(&catalog),
            config.clone(),
        ));

        Self {
            quota: QuotaGate::new(Arc::clone(&store), config),
            accounts: AccountCoordinator::new(store, Arc::clone(&subscriptions)),
            subscriptions,
            catalog,
        }
    }

    /// Entitlement catalog
    pub fn catalog(&self) -> &EntitlementCatalog {
        &self.catalog
    }

    /// Subscription lifecycle manager
    pub fn subscriptions(&self) -> &SubscriptionManager<S> {
        &self.subscriptions
    }

    /// Quota enforcement gate
    pub fn quota(&self) -> &QuotaGate<S> {
        &self.quota
    }

    /// Account lifecycle coordinator
    pub fn accounts(&self) -> &AccountCoordinator<S> {
        &self.accounts
    }
}

impl<S: Store> std::fmt::Debug for SubscriptionEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionEngine").finish_non_exhaustive()
    }
}
