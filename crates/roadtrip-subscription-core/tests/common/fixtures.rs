//! Engine and data fixtures

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use roadtrip_db::{Collection, Store};
use roadtrip_subscription_core::{Account, EngineConfig, NewAccount, SubscriptionEngine};
use roadtrip_types::{FavoriteRecord, ResourceKind, ResourceRecord, Subscription, User, UserId};
use std::sync::Arc;
use uuid::Uuid;

use super::TrackingStore;

/// Engine over a fresh tracking store
pub struct TestEngine {
    pub store: Arc<TrackingStore>,
    pub engine: SubscriptionEngine<TrackingStore>,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        roadtrip_utils::init_test_tracing();
        let store = Arc::new(TrackingStore::new());
        let engine = SubscriptionEngine::new(Arc::clone(&store), config);
        Self { store, engine }
    }

    /// Create an account with a unique email
    pub async fn account(&self) -> Account {
        self.engine
            .accounts()
            .create_account(NewAccount::new(format!("traveler-{}@example.com", Uuid::new_v4())))
            .await
            .expect("account creation failed")
    }

    pub async fn user(&self, user_id: UserId) -> Option<User> {
        let mut tx = self.store.begin().await.unwrap();
        tx.find_user(user_id).await.unwrap()
    }

    /// Every stored subscription of a user, newest first, exactly as stored
    pub async fn subscriptions(&self, user_id: UserId) -> Vec<Subscription> {
        let mut tx = self.store.begin().await.unwrap();
        tx.subscriptions_for_user(user_id).await.unwrap()
    }

    /// Replace a stored subscription, bypassing the engine
    pub async fn overwrite(&self, subscription: &Subscription) {
        let mut tx = self.store.inner().begin().await.unwrap();
        tx.update_subscription(subscription).await.unwrap();
        tx.commit().await.unwrap();
    }

    /// Insert resources directly, bypassing the quota gate
    pub async fn seed_resources(
        &self,
        user_id: UserId,
        kind: ResourceKind,
        count: usize,
        created_at: DateTime<Utc>,
    ) {
        let mut tx = self.store.inner().begin().await.unwrap();
        for _ in 0..count {
            tx.insert_resource(&ResourceRecord::new(user_id, kind, None).created_at(created_at))
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();
    }

    pub async fn seed_favorite(&self, user_id: UserId) {
        let mut tx = self.store.inner().begin().await.unwrap();
        tx.insert_favorite(&FavoriteRecord::new(user_id, Uuid::new_v4()))
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    pub async fn count(&self, user_id: UserId, collection: Collection) -> u64 {
        let mut tx = self.store.begin().await.unwrap();
        tx.count_owned(user_id, collection).await.unwrap()
    }

    /// Subscriptions granting access right now
    pub async fn current_count(&self, user_id: UserId) -> usize {
        let now = Utc::now();
        self.subscriptions(user_id)
            .await
            .iter()
            .filter(|s| s.is_current(now))
            .count()
    }
}
