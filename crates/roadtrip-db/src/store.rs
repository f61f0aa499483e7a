//! Storage traits
//!
//! Define the unit-of-work interface used by the subscription engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use roadtrip_types::{
    FavoriteRecord, PaymentRecord, ResourceKind, ResourceRecord, Subscription, SubscriptionId,
    User, UserId,
};

use crate::error::DbResult;

/// Collections holding records keyed by an owning user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Subscriptions,
    Trips,
    AiHistory,
    Favorites,
    Payments,
}

impl Collection {
    /// Every collection that references a user
    pub const ALL: [Collection; 5] = [
        Self::Subscriptions,
        Self::Trips,
        Self::AiHistory,
        Self::Favorites,
        Self::Payments,
    ];

    /// Collection storing a quota-limited resource kind
    pub const fn for_resource(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Trip => Self::Trips,
            ResourceKind::AiConsultation => Self::AiHistory,
        }
    }

    /// Get the collection name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Subscriptions => "subscriptions",
            Self::Trips => "trips",
            Self::AiHistory => "ai_histories",
            Self::Favorites => "favorites",
            Self::Payments => "payments",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of transactions
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a new unit of work
    async fn begin(&self) -> DbResult<Box<dyn Transaction>>;
}

/// One atomic unit of work.
///
/// Writes become visible to other transactions only after [`Transaction::commit`].
/// A transaction dropped without commit is rolled back.
#[async_trait]
pub trait Transaction: Send {
    // =========================================================================
    // User directory
    // =========================================================================

    /// Find a user by ID
    async fn find_user(&mut self, id: UserId) -> DbResult<Option<User>>;

    /// Find a user by (lowercased) email
    async fn find_user_by_email(&mut self, email: &str) -> DbResult<Option<User>>;

    /// Lock a user row for the rest of the transaction; false if absent
    async fn lock_user(&mut self, id: UserId) -> DbResult<bool>;

    /// Insert a user; fails with `UniqueViolation` on a taken email
    async fn insert_user(&mut self, user: &User) -> DbResult<()>;

    /// Replace a stored user
    async fn update_user(&mut self, user: &User) -> DbResult<()>;

    /// Delete a user; false if absent
    async fn delete_user(&mut self, id: UserId) -> DbResult<bool>;

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Find a subscription by ID
    async fn find_subscription(&mut self, id: SubscriptionId) -> DbResult<Option<Subscription>>;

    /// All subscriptions owned by a user, newest first
    async fn subscriptions_for_user(&mut self, user_id: UserId) -> DbResult<Vec<Subscription>>;

    /// Insert a subscription
    async fn insert_subscription(&mut self, subscription: &Subscription) -> DbResult<()>;

    /// Replace a stored subscription
    async fn update_subscription(&mut self, subscription: &Subscription) -> DbResult<()>;

    // =========================================================================
    // Quota-limited resources
    // =========================================================================

    /// Serialize quota checks for one user and kind until the transaction ends
    async fn lock_quota(&mut self, user_id: UserId, kind: ResourceKind) -> DbResult<()>;

    /// Count every resource of `kind` owned by the user
    async fn count_by_owner(&mut self, user_id: UserId, kind: ResourceKind) -> DbResult<u64>;

    /// Count resources of `kind` created at or after `since`
    async fn count_by_owner_since(
        &mut self,
        user_id: UserId,
        kind: ResourceKind,
        since: DateTime<Utc>,
    ) -> DbResult<u64>;

    /// Insert a resource record
    async fn insert_resource(&mut self, record: &ResourceRecord) -> DbResult<()>;

    // =========================================================================
    // Dependent records
    // =========================================================================

    /// Insert a favorite
    async fn insert_favorite(&mut self, favorite: &FavoriteRecord) -> DbResult<()>;

    /// Append a payment ledger record
    async fn insert_payment(&mut self, payment: &PaymentRecord) -> DbResult<()>;

    /// Count records in `collection` owned by the user
    async fn count_owned(&mut self, user_id: UserId, collection: Collection) -> DbResult<u64>;

    /// Delete records in `collection` owned by the user, returning the count
    async fn delete_owned(&mut self, user_id: UserId, collection: Collection) -> DbResult<u64>;

    // =========================================================================
    // Completion
    // =========================================================================

    /// Make every write of this transaction durable
    async fn commit(self: Box<Self>) -> DbResult<()>;

    /// Discard every write of this transaction
    async fn rollback(self: Box<Self>) -> DbResult<()>;
}
