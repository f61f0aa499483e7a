//! Subscription lifecycle manager
//!
//! Every operation runs in one transaction: it locks the owning user,
//! normalizes all of the user's subscriptions against the clock, applies its
//! change, re-derives the user's role and commits. Reads that correct stale
//! statuses take the same lock. Any error drops the transaction, so nothing is
//! written.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use roadtrip_db::{Store, Transaction};
use roadtrip_types::{
    FeatureSet, PaymentEntry, PaymentEvent, PaymentInfo, PaymentMethod, PaymentRecord, Plan,
    Subscription, SubscriptionId, SubscriptionStatus, UsageStats, User, UserId,
};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::catalog::EntitlementCatalog;
use crate::config::EngineConfig;
use crate::role::plan_to_role;
use crate::status::{normalize_status, select_current};
use crate::{EngineError, EngineResult};

/// Page size used when none is requested
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
/// Largest page size accepted by [`SubscriptionManager::subscription_history`]
pub const MAX_HISTORY_LIMIT: u32 = 100;

/// Filter and page for a history query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub status: Option<SubscriptionStatus>,
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            status: None,
            page: 1,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl HistoryQuery {
    /// Only return subscriptions with this status
    pub fn with_status(mut self, status: SubscriptionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Select a page
    pub fn with_page(mut self, page: u32, limit: u32) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }
}

/// One page of a user's subscriptions, newest first
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub subscriptions: Vec<Subscription>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

/// Entitlements currently available to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableFeatures {
    pub plan: Plan,
    pub features: FeatureSet,
    /// `None` when the user has no current subscription and gets free-plan defaults
    pub subscription_id: Option<SubscriptionId>,
}

/// Subscription lifecycle manager
pub struct SubscriptionManager<S: Store> {
    store: Arc<S>,
    catalog: Arc<EntitlementCatalog>,
    config: EngineConfig,
}

impl<S: Store> SubscriptionManager<S> {
    /// Create a new lifecycle manager
    pub fn new(store: Arc<S>, catalog: Arc<EntitlementCatalog>, config: EngineConfig) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    /// The catalog snapshots are taken from
    pub fn catalog(&self) -> &EntitlementCatalog {
        &self.catalog
    }

    /// Build and insert a free-plan subscription inside the caller's transaction.
    ///
    /// Does not touch the user row; the caller links it.
    pub async fn create_default_in(
        &self,
        tx: &mut dyn Transaction,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> EngineResult<Subscription> {
        let subscription = self.new_subscription(user_id, Plan::Free, PaymentMethod::Free, now);
        tx.insert_subscription(&subscription).await?;
        Ok(subscription)
    }

    /// Give an existing user a free-plan subscription
    #[instrument(skip(self))]
    pub async fn create_default_subscription(&self, user_id: UserId) -> EngineResult<Subscription> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut user = lock_and_load_user(tx.as_mut(), user_id).await?;

        let subscriptions = load_normalized(tx.as_mut(), &mut user, now).await?;
        if select_current(&subscriptions, now).is_some() {
            return Err(EngineError::Conflict(
                "user already has a current subscription".to_string(),
            ));
        }

        let subscription = self.create_default_in(tx.as_mut(), user_id, now).await?;
        link_user(tx.as_mut(), &mut user, &subscription, now).await?;
        tx.commit().await?;

        info!(user_id = %user_id, subscription_id = %subscription.id, "Default subscription created");
        record_lifecycle("create_default");
        Ok(subscription)
    }

    /// The subscription currently granting entitlements, if any.
    ///
    /// Stored statuses that no longer match the clock are corrected.
    #[instrument(skip(self))]
    pub async fn current_subscription(&self, user_id: UserId) -> EngineResult<Option<Subscription>> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut user = lock_and_load_user(tx.as_mut(), user_id).await?;

        let subscriptions = load_normalized(tx.as_mut(), &mut user, now).await?;
        let current = select_current(&subscriptions, now).cloned();
        tx.commit().await?;

        Ok(current)
    }

    /// Move the current subscription to another plan.
    ///
    /// The term restarts from now and the feature snapshot is retaken.
    #[instrument(skip(self))]
    pub async fn change_plan(
        &self,
        user_id: UserId,
        plan: &str,
        payment_method: Option<&str>,
    ) -> EngineResult<Subscription> {
        let plan = self.catalog.resolve(plan)?;
        let method = parse_method(payment_method)?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut user = lock_and_load_user(tx.as_mut(), user_id).await?;

        let subscriptions = load_normalized(tx.as_mut(), &mut user, now).await?;
        let mut subscription = select_current(&subscriptions, now)
            .cloned()
            .ok_or(EngineError::NoActiveSubscription)?;

        let method = method.unwrap_or(subscription.payment_info.method);
        require_paid_method(plan, method)?;

        let previous = subscription.plan;
        subscription.plan = plan;
        subscription.features = self.catalog.derive_features(plan);
        subscription.end_date = self.config.term_end(plan, now);
        subscription.payment_info.method = method;
        let mut subscription = normalize_status(subscription, now);
        subscription.updated_at = now;
        tx.update_subscription(&subscription).await?;

        link_user(tx.as_mut(), &mut user, &subscription, now).await?;
        tx.commit().await?;

        info!(
            user_id = %user_id,
            from = %previous,
            plan = %plan,
            end_date = %subscription.end_date,
            "Subscription plan changed"
        );
        record_lifecycle("change_plan");
        Ok(subscription)
    }

    /// Cancel the current subscription immediately
    #[instrument(skip(self))]
    pub async fn cancel_subscription(
        &self,
        user_id: UserId,
        reason: Option<&str>,
    ) -> EngineResult<Subscription> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut user = lock_and_load_user(tx.as_mut(), user_id).await?;

        let subscriptions = load_normalized(tx.as_mut(), &mut user, now).await?;
        let mut subscription = select_current(&subscriptions, now)
            .cloned()
            .ok_or(EngineError::NoActiveSubscription)?;

        subscription.status = SubscriptionStatus::Canceled;
        subscription.end_date = now;
        subscription.canceled_at.get_or_insert(now);
        subscription.cancel_reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        subscription.auto_renew = false;
        subscription.updated_at = now;
        tx.update_subscription(&subscription).await?;

        user.role = plan_to_role(Plan::Free);
        user.active_subscription = None;
        user.updated_at = now;
        tx.update_user(&user).await?;
        tx.commit().await?;

        info!(user_id = %user_id, plan = %subscription.plan, "Subscription canceled");
        record_lifecycle("cancel");
        Ok(subscription)
    }

    /// Start a new subscription for a user with none current
    #[instrument(skip(self))]
    pub async fn reactivate_subscription(
        &self,
        user_id: UserId,
        plan: &str,
        payment_method: Option<&str>,
    ) -> EngineResult<Subscription> {
        let plan = self.catalog.resolve(plan)?;
        let method = parse_method(payment_method)?.unwrap_or(PaymentMethod::Free);
        require_paid_method(plan, method)?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut user = lock_and_load_user(tx.as_mut(), user_id).await?;

        let subscriptions = load_normalized(tx.as_mut(), &mut user, now).await?;
        if let Some(current) = select_current(&subscriptions, now) {
            return Err(EngineError::Conflict(format!(
                "subscription {} is still current",
                current.id
            )));
        }

        let subscription = self.new_subscription(user_id, plan, method, now);
        tx.insert_subscription(&subscription).await?;
        link_user(tx.as_mut(), &mut user, &subscription, now).await?;
        tx.commit().await?;

        info!(user_id = %user_id, plan = %plan, subscription_id = %subscription.id, "Subscription reactivated");
        record_lifecycle("reactivate");
        Ok(subscription)
    }

    /// Extend a subscription by one term.
    ///
    /// Renews the current subscription, or failing that the most recent one
    /// that lapsed without being canceled or suspended. The new term runs
    /// from the old end date, or from now if that is already past.
    #[instrument(skip(self))]
    pub async fn renew_subscription(&self, user_id: UserId) -> EngineResult<Subscription> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut user = lock_and_load_user(tx.as_mut(), user_id).await?;

        let subscriptions = load_normalized(tx.as_mut(), &mut user, now).await?;
        let mut subscription = match select_current(&subscriptions, now) {
            Some(current) => current.clone(),
            None => subscriptions
                .iter()
                .filter(|s| !s.status.is_sticky())
                .max_by_key(|s| (s.end_date, s.created_at))
                .cloned()
                .ok_or(EngineError::NoActiveSubscription)?,
        };

        let from = subscription.end_date.max(now);
        subscription.end_date = self.config.term_end(subscription.plan, from);
        subscription.status = SubscriptionStatus::Active;
        let mut subscription = normalize_status(subscription, now);
        subscription.updated_at = now;
        tx.update_subscription(&subscription).await?;

        link_user(tx.as_mut(), &mut user, &subscription, now).await?;
        tx.commit().await?;

        info!(user_id = %user_id, plan = %subscription.plan, end_date = %subscription.end_date, "Subscription renewed");
        record_lifecycle("renew");
        Ok(subscription)
    }

    /// Append a payment to an active subscription and the payment ledger
    #[instrument(skip(self, event), fields(amount_cents = event.amount_cents))]
    pub async fn record_payment(
        &self,
        subscription_id: SubscriptionId,
        event: PaymentEvent,
    ) -> EngineResult<Subscription> {
        if event.amount_cents < 0 {
            return Err(EngineError::validation("amountCents", "must not be negative"));
        }

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let owner = tx
            .find_subscription(subscription_id)
            .await?
            .ok_or(EngineError::NotFound("subscription"))?
            .user_id;
        tx.lock_user(owner).await?;

        // Re-read under the lock; the first read may predate a committed renewal
        let subscription = tx
            .find_subscription(subscription_id)
            .await?
            .ok_or(EngineError::NotFound("subscription"))?;

        let mut subscription = normalize_status(subscription, now);
        if subscription.status != SubscriptionStatus::Active {
            return Err(EngineError::NotActive(subscription.status));
        }

        let entry = PaymentEntry::from_event(event, now);
        let record = PaymentRecord::from_entry(subscription.user_id, subscription.id, &entry);
        subscription.payment_history.push(entry);
        subscription.updated_at = now;
        tx.update_subscription(&subscription).await?;
        tx.insert_payment(&record).await?;
        tx.commit().await?;

        info!(
            subscription_id = %subscription_id,
            amount_cents = record.amount_cents,
            currency = %record.currency,
            "Payment recorded"
        );
        record_lifecycle("record_payment");
        Ok(subscription)
    }

    /// Page through a user's subscriptions, newest first
    #[instrument(skip(self))]
    pub async fn subscription_history(
        &self,
        user_id: UserId,
        query: HistoryQuery,
    ) -> EngineResult<HistoryPage> {
        if query.page == 0 {
            return Err(EngineError::validation("page", "must be at least 1"));
        }
        if query.limit == 0 || query.limit > MAX_HISTORY_LIMIT {
            return Err(EngineError::validation(
                "limit",
                format!("must be between 1 and {MAX_HISTORY_LIMIT}"),
            ));
        }

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut user = lock_and_load_user(tx.as_mut(), user_id).await?;
        let subscriptions = load_normalized(tx.as_mut(), &mut user, now).await?;
        tx.commit().await?;

        let matching: Vec<Subscription> = subscriptions
            .into_iter()
            .filter(|s| query.status.map_or(true, |status| s.status == status))
            .collect();
        let total = matching.len() as u64;
        let skip = (query.page as usize - 1).saturating_mul(query.limit as usize);

        Ok(HistoryPage {
            subscriptions: matching
                .into_iter()
                .skip(skip)
                .take(query.limit as usize)
                .collect(),
            total,
            page: query.page,
            total_pages: total.div_ceil(u64::from(query.limit)) as u32,
        })
    }

    /// Plan and feature snapshot in force for a user
    #[instrument(skip(self))]
    pub async fn available_features(&self, user_id: UserId) -> EngineResult<AvailableFeatures> {
        let current = self.current_subscription(user_id).await?;

        Ok(match current {
            Some(subscription) => AvailableFeatures {
                plan: subscription.plan,
                features: subscription.features,
                subscription_id: Some(subscription.id),
            },
            None => AvailableFeatures {
                plan: Plan::Free,
                features: self.catalog.derive_features(Plan::Free),
                subscription_id: None,
            },
        })
    }

    fn new_subscription(
        &self,
        user_id: UserId,
        plan: Plan,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Subscription {
        Subscription {
            id: SubscriptionId::new(),
            user_id,
            plan,
            status: SubscriptionStatus::Active,
            start_date: now,
            end_date: self.config.term_end(plan, now),
            trial_ends_at: None,
            canceled_at: None,
            cancel_reason: None,
            auto_renew: true,
            payment_info: PaymentInfo::with_method(method),
            payment_history: Vec::new(),
            features: self.catalog.derive_features(plan),
            usage_stats: UsageStats::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl<S: Store> std::fmt::Debug for SubscriptionManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Lock the user row and load it
pub(crate) async fn lock_and_load_user(
    tx: &mut dyn Transaction,
    user_id: UserId,
) -> EngineResult<User> {
    if !tx.lock_user(user_id).await? {
        return Err(EngineError::NotFound("user"));
    }
    tx.find_user(user_id)
        .await?
        .ok_or(EngineError::NotFound("user"))
}

/// Normalize every subscription of a locked user, persisting corrected
/// statuses.
///
/// The user's role and active reference are re-pointed at whatever is current
/// afterwards, so a lapsed paid plan stops granting its role.
pub(crate) async fn load_normalized(
    tx: &mut dyn Transaction,
    user: &mut User,
    now: DateTime<Utc>,
) -> EngineResult<Vec<Subscription>> {
    let stored = tx.subscriptions_for_user(user.id).await?;
    let mut subscriptions = Vec::with_capacity(stored.len());

    for subscription in stored {
        let mut normalized = normalize_status(subscription.clone(), now);
        if normalized != subscription {
            debug!(
                subscription_id = %normalized.id,
                from = %subscription.status,
                to = %normalized.status,
                "Subscription status corrected"
            );
            normalized.updated_at = now;
            tx.update_subscription(&normalized).await?;
        }
        subscriptions.push(normalized);
    }

    let current = select_current(&subscriptions, now);
    let role = plan_to_role(current.map_or(Plan::Free, |s| s.plan));
    let active = current.map(|s| s.id);
    if user.role != role || user.active_subscription != active {
        debug!(
            user_id = %user.id,
            from = %user.role,
            to = %role,
            "User role resynced"
        );
        user.role = role;
        user.active_subscription = active;
        user.updated_at = now;
        tx.update_user(user).await?;
    }

    Ok(subscriptions)
}

/// Point the user at `subscription` and re-derive its role
async fn link_user(
    tx: &mut dyn Transaction,
    user: &mut User,
    subscription: &Subscription,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    user.role = plan_to_role(subscription.plan);
    user.active_subscription = Some(subscription.id);
    user.updated_at = now;
    tx.update_user(user).await?;
    Ok(())
}

fn parse_method(method: Option<&str>) -> EngineResult<Option<PaymentMethod>> {
    method.map(|m| m.parse::<PaymentMethod>()).transpose().map_err(Into::into)
}

fn require_paid_method(plan: Plan, method: PaymentMethod) -> EngineResult<()> {
    if plan.is_paid() && method == PaymentMethod::Free {
        return Err(EngineError::validation(
            "paymentMethod",
            format!("a payment method is required for the {plan} plan"),
        ));
    }
    Ok(())
}

fn record_lifecycle(operation: &'static str) {
    metrics::counter!("subscription_lifecycle_total", "operation" => operation).increment(1);
}
