//! Store wrapper recording committed writes and call order

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use roadtrip_db::{Collection, DbResult, InMemoryStore, Store, Transaction};
use roadtrip_types::{
    FavoriteRecord, PaymentRecord, ResourceKind, ResourceRecord, Subscription, SubscriptionId,
    User, UserId,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory store that counts writes of committed transactions by operation
/// and keeps the call sequence of each committed transaction
#[derive(Clone, Default)]
pub struct TrackingStore {
    inner: InMemoryStore,
    committed: Arc<DashMap<&'static str, usize>>,
    traces: Arc<DashMap<usize, Vec<&'static str>>>,
    sequence: Arc<AtomicUsize>,
}

impl TrackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped store, for fault injection and direct inspection
    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    /// Committed writes of one kind, e.g. `update_subscription`
    #[allow(dead_code)]
    pub fn committed(&self, operation: &str) -> usize {
        self.committed.get(operation).map_or(0, |c| *c.value())
    }

    /// Committed writes of every kind
    #[allow(dead_code)]
    pub fn committed_total(&self) -> usize {
        self.committed.iter().map(|c| *c.value()).sum()
    }

    /// Calls made by each committed transaction, oldest transaction first
    #[allow(dead_code)]
    pub fn committed_calls(&self) -> Vec<Vec<&'static str>> {
        let mut traces: Vec<_> = self
            .traces
            .iter()
            .map(|t| (*t.key(), t.value().clone()))
            .collect();
        traces.sort_by_key(|(seq, _)| *seq);
        traces.into_iter().map(|(_, calls)| calls).collect()
    }

    /// Calls of the most recent committed transaction that made `call`
    #[allow(dead_code)]
    pub fn last_trace_with(&self, call: &str) -> Option<Vec<&'static str>> {
        self.committed_calls()
            .into_iter()
            .rev()
            .find(|calls| calls.contains(&call))
    }
}

#[async_trait]
impl Store for TrackingStore {
    async fn begin(&self) -> DbResult<Box<dyn Transaction>> {
        Ok(Box::new(TrackingTransaction {
            inner: self.inner.begin().await?,
            writes: Vec::new(),
            calls: Vec::new(),
            committed: Arc::clone(&self.committed),
            traces: Arc::clone(&self.traces),
            sequence: Arc::clone(&self.sequence),
        }))
    }
}

struct TrackingTransaction {
    inner: Box<dyn Transaction>,
    writes: Vec<&'static str>,
    calls: Vec<&'static str>,
    committed: Arc<DashMap<&'static str, usize>>,
    traces: Arc<DashMap<usize, Vec<&'static str>>>,
    sequence: Arc<AtomicUsize>,
}

#[async_trait]
impl Transaction for TrackingTransaction {
    async fn find_user(&mut self, id: UserId) -> DbResult<Option<User>> {
        self.calls.push("find_user");
        self.inner.find_user(id).await
    }

    async fn find_user_by_email(&mut self, email: &str) -> DbResult<Option<User>> {
        self.calls.push("find_user_by_email");
        self.inner.find_user_by_email(email).await
    }

    async fn lock_user(&mut self, id: UserId) -> DbResult<bool> {
        self.calls.push("lock_user");
        self.inner.lock_user(id).await
    }

    async fn insert_user(&mut self, user: &User) -> DbResult<()> {
        self.calls.push("insert_user");
        self.writes.push("insert_user");
        self.inner.insert_user(user).await
    }

    async fn update_user(&mut self, user: &User) -> DbResult<()> {
        self.calls.push("update_user");
        self.writes.push("update_user");
        self.inner.update_user(user).await
    }

    async fn delete_user(&mut self, id: UserId) -> DbResult<bool> {
        self.calls.push("delete_user");
        self.writes.push("delete_user");
        self.inner.delete_user(id).await
    }

    async fn find_subscription(&mut self, id: SubscriptionId) -> DbResult<Option<Subscription>> {
        self.calls.push("find_subscription");
        self.inner.find_subscription(id).await
    }

    async fn subscriptions_for_user(&mut self, user_id: UserId) -> DbResult<Vec<Subscription>> {
        self.calls.push("subscriptions_for_user");
        self.inner.subscriptions_for_user(user_id).await
    }

    async fn insert_subscription(&mut self, subscription: &Subscription) -> DbResult<()> {
        self.calls.push("insert_subscription");
        self.writes.push("insert_subscription");
        self.inner.insert_subscription(subscription).await
    }

    async fn update_subscription(&mut self, subscription: &Subscription) -> DbResult<()> {
        self.calls.push("update_subscription");
        self.writes.push("update_subscription");
        self.inner.update_subscription(subscription).await
    }

    async fn lock_quota(&mut self, user_id: UserId, kind: ResourceKind) -> DbResult<()> {
        self.calls.push("lock_quota");
        self.inner.lock_quota(user_id, kind).await
    }

    async fn count_by_owner(&mut self, user_id: UserId, kind: ResourceKind) -> DbResult<u64> {
        self.calls.push("count_by_owner");
        self.inner.count_by_owner(user_id, kind).await
    }

    async fn count_by_owner_since(
        &mut self,
        user_id: UserId,
        kind: ResourceKind,
        since: DateTime<Utc>,
    ) -> DbResult<u64> {
        self.calls.push("count_by_owner_since");
        self.inner.count_by_owner_since(user_id, kind, since).await
    }

    async fn insert_resource(&mut self, record: &ResourceRecord) -> DbResult<()> {
        self.calls.push("insert_resource");
        self.writes.push("insert_resource");
        self.inner.insert_resource(record).await
    }

    async fn insert_favorite(&mut self, favorite: &FavoriteRecord) -> DbResult<()> {
        self.calls.push("insert_favorite");
        self.writes.push("insert_favorite");
        self.inner.insert_favorite(favorite).await
    }

    async fn insert_payment(&mut self, payment: &PaymentRecord) -> DbResult<()> {
        self.calls.push("insert_payment");
        self.writes.push("insert_payment");
        self.inner.insert_payment(payment).await
    }

    async fn count_owned(&mut self, user_id: UserId, collection: Collection) -> DbResult<u64> {
        self.calls.push("count_owned");
        self.inner.count_owned(user_id, collection).await
    }

    async fn delete_owned(&mut self, user_id: UserId, collection: Collection) -> DbResult<u64> {
        self.calls.push("delete_owned");
        self.writes.push("delete_owned");
        self.inner.delete_owned(user_id, collection).await
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let Self {
            inner,
            writes,
            calls,
            committed,
            traces,
            sequence,
        } = *self;
        inner.commit().await?;
        for write in writes {
            *committed.entry(write).or_insert(0) += 1;
        }
        traces.insert(sequence.fetch_add(1, Ordering::SeqCst), calls);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        self.inner.rollback().await
    }
}
