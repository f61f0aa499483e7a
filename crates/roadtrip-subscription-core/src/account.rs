//! Account lifecycle coordinator

use std::sync::Arc;

use chrono::Utc;
use roadtrip_db::{Collection, Store};
use roadtrip_types::{Subscription, User, UserId};
use serde::Serialize;
use tracing::{info, instrument};

use crate::lifecycle::SubscriptionManager;
use crate::{EngineError, EngineResult};

/// Details for a new account
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl NewAccount {
    /// New account with just an email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    /// Set the display name
    pub fn with_name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self.last_name = Some(last_name.into());
        self
    }
}

/// A freshly created account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub user: User,
    pub subscription: Subscription,
}

/// Rows removed by [`AccountCoordinator::delete_account`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionReport {
    pub subscriptions: u64,
    pub trips: u64,
    pub ai_history: u64,
    pub favorites: u64,
    pub payments: u64,
}

impl DeletionReport {
    fn set(&mut self, collection: Collection, count: u64) {
        match collection {
            Collection::Subscriptions => self.subscriptions = count,
            Collection::Trips => self.trips = count,
            Collection::AiHistory => self.ai_history = count,
            Collection::Favorites => self.favorites = count,
            Collection::Payments => self.payments = count,
        }
    }

    /// Dependent rows removed across every collection
    pub fn total(&self) -> u64 {
        self.subscriptions + self.trips + self.ai_history + self.favorites + self.payments
    }
}

/// Creates and destroys accounts atomically
pub struct AccountCoordinator<S: Store> {
    store: Arc<S>,
    subscriptions: Arc<SubscriptionManager<S>>,
}

impl<S: Store> AccountCoordinator<S> {
    /// Create a new coordinator
    pub fn new(store: Arc<S>, subscriptions: Arc<SubscriptionManager<S>>) -> Self {
        Self {
            store,
            subscriptions,
        }
    }

    /// Create a user together with its free-plan subscription
    #[instrument(skip(self, account), fields(email = %account.email))]
    pub async fn create_account(&self, account: NewAccount) -> EngineResult<Account> {
        let email = normalize_email(&account.email)?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        if tx.find_user_by_email(&email).await?.is_some() {
            return Err(EngineError::Conflict("email already registered".to_string()));
        }

        let mut user = User::new(email);
        user.first_name = clean_name(account.first_name);
        user.last_name = clean_name(account.last_name);
        user.created_at = now;
        user.updated_at = now;
        tx.insert_user(&user).await?;

        let subscription = self
            .subscriptions
            .create_default_in(tx.as_mut(), user.id, now)
            .await?;
        user.active_subscription = Some(subscription.id);
        tx.update_user(&user).await?;
        tx.commit().await?;

        info!(user_id = %user.id, subscription_id = %subscription.id, "Account created");
        metrics::counter!("accounts_total", "operation" => "create").increment(1);
        Ok(Account { user, subscription })
    }

    /// Delete a user and every record that references it
    #[instrument(skip(self))]
    pub async fn delete_account(&self, user_id: UserId) -> EngineResult<DeletionReport> {
        let mut tx = self.store.begin().await?;
        if !tx.lock_user(user_id).await? {
            return Err(EngineError::NotFound("user"));
        }

        let mut report = DeletionReport::default();
        for collection in Collection::ALL {
            let deleted = tx.delete_owned(user_id, collection).await?;
            report.set(collection, deleted);
        }

        if !tx.delete_user(user_id).await? {
            return Err(EngineError::NotFound("user"));
        }
        tx.commit().await?;

        info!(user_id = %user_id, rows = report.total(), "Account deleted");
        metrics::counter!("accounts_total", "operation" => "delete").increment(1);
        Ok(report)
    }
}

impl<S: Store> std::fmt::Debug for AccountCoordinator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCoordinator").finish_non_exhaustive()
    }
}

/// Trim and lowercase an email, rejecting obviously malformed ones
fn normalize_email(email: &str) -> EngineResult<String> {
    let email = email.trim().to_lowercase();

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(EngineError::validation("email", "not a valid email address"));
    }
    Ok(email)
}

fn clean_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}
