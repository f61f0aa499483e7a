//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use roadtrip_types::{
    FeatureSet, PaymentEntry, PaymentInfo, Subscription, SubscriptionId, UsageStats, User, UserId,
};

use crate::error::DbError;

/// User row from the database
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub privilege: String,
    pub active_subscription_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subscription row from the database
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub auto_renew: bool,
    pub payment_info: Json<PaymentInfo>,
    pub payment_history: Json<Vec<PaymentEntry>>,
    pub features: Json<FeatureSet>,
    pub usage_stats: Json<UsageStats>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn corrupt(table: &str, id: Uuid, err: impl std::fmt::Display) -> DbError {
    DbError::Corrupt(format!("{table} {id}: {err}"))
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId(row.id),
            role: row.role.parse().map_err(|e| corrupt("users", row.id, e))?,
            privilege: row.privilege.parse().map_err(|e| corrupt("users", row.id, e))?,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            active_subscription: row.active_subscription_id.map(SubscriptionId),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DbError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: SubscriptionId(row.id),
            user_id: UserId(row.user_id),
            plan: row.plan.parse().map_err(|e| corrupt("subscriptions", row.id, e))?,
            status: row
                .status
                .parse()
                .map_err(|e| corrupt("subscriptions", row.id, e))?,
            start_date: row.start_date,
            end_date: row.end_date,
            trial_ends_at: row.trial_ends_at,
            canceled_at: row.canceled_at,
            cancel_reason: row.cancel_reason,
            auto_renew: row.auto_renew,
            payment_info: row.payment_info.0,
            payment_history: row.payment_history.0,
            features: row.features.0,
            usage_stats: row.usage_stats.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
