//! PostgreSQL transaction

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Postgres;

use roadtrip_types::{
    FavoriteRecord, PaymentRecord, ResourceKind, ResourceRecord, Subscription, SubscriptionId,
    User, UserId,
};

use super::{resource, subscription, user};
use crate::error::DbResult;
use crate::store::{Collection, Transaction};

/// Unit of work backed by a PostgreSQL transaction
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

impl PgTransaction {
    pub(crate) fn new(tx: sqlx::Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

impl std::fmt::Debug for PgTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTransaction").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn find_user(&mut self, id: UserId) -> DbResult<Option<User>> {
        user::find_by_id(&mut self.tx, id).await
    }

    async fn find_user_by_email(&mut self, email: &str) -> DbResult<Option<User>> {
        user::find_by_email(&mut self.tx, email).await
    }

    async fn lock_user(&mut self, id: UserId) -> DbResult<bool> {
        user::lock(&mut self.tx, id).await
    }

    async fn insert_user(&mut self, user: &User) -> DbResult<()> {
        user::insert(&mut self.tx, user).await
    }

    async fn update_user(&mut self, user: &User) -> DbResult<()> {
        user::update(&mut self.tx, user).await
    }

    async fn delete_user(&mut self, id: UserId) -> DbResult<bool> {
        user::delete(&mut self.tx, id).await
    }

    async fn find_subscription(&mut self, id: SubscriptionId) -> DbResult<Option<Subscription>> {
        subscription::find_by_id(&mut self.tx, id).await
    }

    async fn subscriptions_for_user(&mut self, user_id: UserId) -> DbResult<Vec<Subscription>> {
        subscription::find_by_user_id(&mut self.tx, user_id).await
    }

    async fn insert_subscription(&mut self, sub: &Subscription) -> DbResult<()> {
        subscription::insert(&mut self.tx, sub).await
    }

    async fn update_subscription(&mut self, sub: &Subscription) -> DbResult<()> {
        subscription::update(&mut self.tx, sub).await
    }

    async fn lock_quota(&mut self, user_id: UserId, kind: ResourceKind) -> DbResult<()> {
        resource::lock_quota(&mut self.tx, user_id, kind).await
    }

    async fn count_by_owner(&mut self, user_id: UserId, kind: ResourceKind) -> DbResult<u64> {
        resource::count_by_owner(&mut self.tx, user_id, kind).await
    }

    async fn count_by_owner_since(
        &mut self,
        user_id: UserId,
        kind: ResourceKind,
        since: DateTime<Utc>,
    ) -> DbResult<u64> {
        resource::count_by_owner_since(&mut self.tx, user_id, kind, since).await
    }

    async fn insert_resource(&mut self, record: &ResourceRecord) -> DbResult<()> {
        resource::insert(&mut self.tx, record).await
    }

    async fn insert_favorite(&mut self, favorite: &FavoriteRecord) -> DbResult<()> {
        resource::insert_favorite(&mut self.tx, favorite).await
    }

    async fn insert_payment(&mut self, payment: &PaymentRecord) -> DbResult<()> {
        resource::insert_payment(&mut self.tx, payment).await
    }

    async fn count_owned(&mut self, user_id: UserId, collection: Collection) -> DbResult<u64> {
        resource::count_owned(&mut self.tx, user_id, collection).await
    }

    async fn delete_owned(&mut self, user_id: UserId, collection: Collection) -> DbResult<u64> {
        resource::delete_owned(&mut self.tx, user_id, collection).await
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        self.tx.commit().await?;
        tracing::trace!("Transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
