//! Quota enforcement gate

use std::sync::Arc;

use chrono::{DateTime, Utc};
use roadtrip_db::{Store, Transaction};
use roadtrip_types::{QuotaDecision, ResourceKind, ResourceRecord, Subscription, UserId};
use tracing::{info, instrument, warn};

use crate::config::EngineConfig;
use crate::lifecycle::load_normalized;
use crate::status::select_current;
use crate::{EngineError, EngineResult};

/// Checks usage of quota-limited resources against the current plan
pub struct QuotaGate<S: Store> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S: Store> QuotaGate<S> {
    /// Create a new quota gate
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Whether the user may create one more resource of `kind`.
    ///
    /// Advisory only; use [`QuotaGate::create_resource`] to create atomically.
    #[instrument(skip(self))]
    pub async fn check_quota(&self, user_id: UserId, kind: ResourceKind) -> EngineResult<QuotaDecision> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let (_, decision) = self.evaluate(tx.as_mut(), user_id, kind, now).await?;
        tx.commit().await?;
        Ok(decision)
    }

    /// Check the quota inside the caller's transaction.
    ///
    /// Holds the user lock and the per-(user, kind) quota lock until the
    /// transaction ends, so a resource inserted in the same transaction after
    /// an `Allow` cannot be raced past the limit.
    pub async fn check_and_reserve(
        &self,
        tx: &mut dyn Transaction,
        user_id: UserId,
        kind: ResourceKind,
    ) -> EngineResult<QuotaDecision> {
        let (_, decision) = self.evaluate(tx, user_id, kind, Utc::now()).await?;
        Ok(decision)
    }

    /// Create a resource if the user's plan allows it
    #[instrument(skip(self, title))]
    pub async fn create_resource(
        &self,
        user_id: UserId,
        kind: ResourceKind,
        title: Option<String>,
    ) -> EngineResult<ResourceRecord> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let (mut subscription, decision) = self.evaluate(tx.as_mut(), user_id, kind, now).await?;
        if let QuotaDecision::Deny { limit, current, .. } = decision {
            return Err(EngineError::QuotaExceeded {
                feature: kind.feature_name(),
                limit,
                current,
                plan: subscription.plan,
            });
        }

        let record = ResourceRecord::new(user_id, kind, title).created_at(now);
        tx.insert_resource(&record).await?;

        subscription.usage_stats.record(kind, now);
        subscription.updated_at = now;
        tx.update_subscription(&subscription).await?;
        tx.commit().await?;

        info!(user_id = %user_id, kind = %kind, resource_id = %record.id, "Resource created");
        Ok(record)
    }

    async fn evaluate(
        &self,
        tx: &mut dyn Transaction,
        user_id: UserId,
        kind: ResourceKind,
        now: DateTime<Utc>,
    ) -> EngineResult<(Subscription, QuotaDecision)> {
        // Usage stats live on the subscription row, shared by every kind
        if !tx.lock_user(user_id).await? {
            return Err(EngineError::SubscriptionRequired);
        }
        let mut user = tx
            .find_user(user_id)
            .await?
            .ok_or(EngineError::SubscriptionRequired)?;
        tx.lock_quota(user_id, kind).await?;

        let subscriptions = load_normalized(tx, &mut user, now).await?;
        let subscription = select_current(&subscriptions, now)
            .cloned()
            .ok_or(EngineError::SubscriptionRequired)?;

        let current = match self.config.window_for(kind).since(now) {
            None => tx.count_by_owner(user_id, kind).await?,
            Some(since) => tx.count_by_owner_since(user_id, kind, since).await?,
        };
        let limit = subscription.features.limit_for(kind);

        let decision = if current >= u64::from(limit) {
            let feature = kind.feature_name();
            warn!(
                user_id = %user_id,
                feature,
                limit,
                current,
                plan = %subscription.plan,
                "Quota exceeded"
            );
            metrics::counter!("quota_denied_total", "feature" => feature).increment(1);
            QuotaDecision::Deny {
                reason: format!(
                    "{feature} limit of {limit} reached on the {} plan",
                    subscription.plan
                ),
                feature: feature.to_string(),
                limit,
                current,
            }
        } else {
            QuotaDecision::Allow { limit, current }
        };

        Ok((subscription, decision))
    }
}

impl<S: Store> std::fmt::Debug for QuotaGate<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaGate")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
