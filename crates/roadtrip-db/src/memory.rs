//! In-memory store
//!
//! Transactions take an exclusive lock on the whole store and work on a copy
//! of every table. Commit swaps the copy in; drop discards it. This gives
//! serializable isolation, which is what the PostgreSQL store provides for
//! the rows the engine locks.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use roadtrip_types::{
    FavoriteRecord, PaymentRecord, ResourceKind, ResourceRecord, Subscription, SubscriptionId,
    User, UserId,
};

use crate::error::{DbError, DbResult};
use crate::store::{Collection, Store, Transaction};

/// Operations that can be made to fail once, for exercising rollback paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertUser,
    UpdateUser,
    InsertSubscription,
    UpdateSubscription,
    InsertResource,
    InsertPayment,
    DeleteOwned(Collection),
    DeleteUser,
    Commit,
}

#[derive(Debug, Default, Clone)]
struct Tables {
    users: HashMap<UserId, User>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    resources: HashMap<Uuid, ResourceRecord>,
    favorites: HashMap<Uuid, FavoriteRecord>,
    payments: HashMap<Uuid, PaymentRecord>,
}

impl Tables {
    fn resources_of(&self, user_id: UserId, kind: ResourceKind) -> impl Iterator<Item = &ResourceRecord> {
        self.resources
            .values()
            .filter(move |r| r.owner == user_id && r.kind == kind)
    }

    fn count_owned(&self, user_id: UserId, collection: Collection) -> u64 {
        let count = match collection {
            Collection::Subscriptions => self
                .subscriptions
                .values()
                .filter(|s| s.user_id == user_id)
                .count(),
            Collection::Trips => self.resources_of(user_id, ResourceKind::Trip).count(),
            Collection::AiHistory => self
                .resources_of(user_id, ResourceKind::AiConsultation)
                .count(),
            Collection::Favorites => self
                .favorites
                .values()
                .filter(|f| f.user_id == user_id)
                .count(),
            Collection::Payments => self
                .payments
                .values()
                .filter(|p| p.user_id == user_id)
                .count(),
        };
        count as u64
    }

    fn delete_owned(&mut self, user_id: UserId, collection: Collection) -> u64 {
        let before = self.count_owned(user_id, collection);
        match collection {
            Collection::Subscriptions => self.subscriptions.retain(|_, s| s.user_id != user_id),
            Collection::Trips => self
                .resources
                .retain(|_, r| !(r.owner == user_id && r.kind == ResourceKind::Trip)),
            Collection::AiHistory => self
                .resources
                .retain(|_, r| !(r.owner == user_id && r.kind == ResourceKind::AiConsultation)),
            Collection::Favorites => self.favorites.retain(|_, f| f.user_id != user_id),
            Collection::Payments => self.payments.retain(|_, p| p.user_id != user_id),
        }
        before
    }
}

/// In-process store with all-or-nothing transactions
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<DashSet<FailPoint>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next occurrence of `point` fail with `DbError::Unavailable`
    pub fn fail_on(&self, point: FailPoint) {
        self.faults.insert(point);
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.tables.lock().await.users.len()
    }

    /// Number of stored subscriptions across all users
    pub async fn subscription_count(&self) -> usize {
        self.tables.lock().await.subscriptions.len()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> DbResult<Box<dyn Transaction>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            working,
            faults: Arc::clone(&self.faults),
        }))
    }
}

/// Transaction over an [`InMemoryStore`]
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    faults: Arc<DashSet<FailPoint>>,
}

impl InMemoryTransaction {
    fn check(&self, point: FailPoint) -> DbResult<()> {
        match self.faults.remove(&point) {
            Some(_) => {
                tracing::debug!(?point, "Injected storage failure");
                Err(DbError::Unavailable(format!("injected failure at {point:?}")))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn find_user(&mut self, id: UserId) -> DbResult<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> DbResult<Option<User>> {
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn lock_user(&mut self, id: UserId) -> DbResult<bool> {
        // The store lock is already exclusive
        Ok(self.working.users.contains_key(&id))
    }

    async fn insert_user(&mut self, user: &User) -> DbResult<()> {
        self.check(FailPoint::InsertUser)?;
        if self.working.users.values().any(|u| u.email == user.email) {
            return Err(DbError::UniqueViolation("users_email_key"));
        }
        if self.working.users.contains_key(&user.id) {
            return Err(DbError::UniqueViolation("users_pkey"));
        }
        self.working.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&mut self, user: &User) -> DbResult<()> {
        self.check(FailPoint::UpdateUser)?;
        let stored = self.working.users.get_mut(&user.id).ok_or(DbError::NotFound)?;
        *stored = user.clone();
        Ok(())
    }

    async fn delete_user(&mut self, id: UserId) -> DbResult<bool> {
        self.check(FailPoint::DeleteUser)?;
        Ok(self.working.users.remove(&id).is_some())
    }

    async fn find_subscription(&mut self, id: SubscriptionId) -> DbResult<Option<Subscription>> {
        Ok(self.working.subscriptions.get(&id).cloned())
    }

    async fn subscriptions_for_user(&mut self, user_id: UserId) -> DbResult<Vec<Subscription>> {
        let mut subs: Vec<Subscription> = self
            .working
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        subs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(subs)
    }

    async fn insert_subscription(&mut self, subscription: &Subscription) -> DbResult<()> {
        self.check(FailPoint::InsertSubscription)?;
        if self.working.subscriptions.contains_key(&subscription.id) {
            return Err(DbError::UniqueViolation("subscriptions_pkey"));
        }
        self.working
            .subscriptions
            .insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn update_subscription(&mut self, subscription: &Subscription) -> DbResult<()> {
        self.check(FailPoint::UpdateSubscription)?;
        let stored = self
            .working
            .subscriptions
            .get_mut(&subscription.id)
            .ok_or(DbError::NotFound)?;
        *stored = subscription.clone();
        Ok(())
    }

    async fn lock_quota(&mut self, _user_id: UserId, _kind: ResourceKind) -> DbResult<()> {
        Ok(())
    }

    async fn count_by_owner(&mut self, user_id: UserId, kind: ResourceKind) -> DbResult<u64> {
        Ok(self.working.resources_of(user_id, kind).count() as u64)
    }

    async fn count_by_owner_since(
        &mut self,
        user_id: UserId,
        kind: ResourceKind,
        since: DateTime<Utc>,
    ) -> DbResult<u64> {
        Ok(self
            .working
            .resources_of(user_id, kind)
            .filter(|r| r.created_at >= since)
            .count() as u64)
    }

    async fn insert_resource(&mut self, record: &ResourceRecord) -> DbResult<()> {
        self.check(FailPoint::InsertResource)?;
        self.working.resources.insert(record.id, record.clone());
        Ok(())
    }

    async fn insert_favorite(&mut self, favorite: &FavoriteRecord) -> DbResult<()> {
        let duplicate = self
            .working
            .favorites
            .values()
            .any(|f| f.user_id == favorite.user_id && f.trip_id == favorite.trip_id);
        if duplicate {
            return Err(DbError::UniqueViolation("favorites_user_id_trip_id_key"));
        }
        self.working.favorites.insert(favorite.id, favorite.clone());
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &PaymentRecord) -> DbResult<()> {
        self.check(FailPoint::InsertPayment)?;
        self.working.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn count_owned(&mut self, user_id: UserId, collection: Collection) -> DbResult<u64> {
        Ok(self.working.count_owned(user_id, collection))
    }

    async fn delete_owned(&mut self, user_id: UserId, collection: Collection) -> DbResult<u64> {
        self.check(FailPoint::DeleteOwned(collection))?;
        Ok(self.working.delete_owned(user_id, collection))
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        self.check(FailPoint::Commit)?;
        let Self {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        Ok(())
    }
}
