//! Subscription types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{FeatureSet, ParseError, PaymentEntry, PaymentInfo, Plan, ResourceKind, UserId};

/// Unique subscription identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    /// Create a new random subscription ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SubscriptionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Subscription status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Awaiting first payment
    Pending,
    /// Subscription is active
    Active,
    /// In trial period
    Trialing,
    /// Payment is past due
    PastDue,
    /// Subscription was canceled
    Canceled,
    /// Term ended without renewal
    Expired,
    /// Suspended by an operator
    Suspended,
}

impl SubscriptionStatus {
    /// Get the status identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
            Self::Suspended => "suspended",
        }
    }

    /// Statuses that can grant access, provided the term has not ended
    pub const fn grants_access(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }

    /// Statuses that date-based derivation never overrides
    pub const fn is_sticky(&self) -> bool {
        matches!(self, Self::Canceled | Self::Suspended)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "trialing" => Ok(Self::Trialing),
            "past_due" => Ok(Self::PastDue),
            "canceled" => Ok(Self::Canceled),
            "expired" => Ok(Self::Expired),
            "suspended" => Ok(Self::Suspended),
            _ => Err(ParseError::InvalidStatus(s.to_string())),
        }
    }
}

/// Usage counters kept on the subscription
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub trips_created: u64,
    pub ai_consultations_used: u64,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl UsageStats {
    /// Count one newly created resource
    pub fn record(&mut self, kind: ResourceKind, at: DateTime<Utc>) {
        match kind {
            ResourceKind::Trip => self.trips_created += 1,
            ResourceKind::AiConsultation => self.ai_consultations_used += 1,
        }
        self.last_used_at = Some(at);
    }
}

/// User subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Subscription ID
    pub id: SubscriptionId,
    /// User who owns the subscription
    pub user_id: UserId,
    /// Current plan
    pub plan: Plan,
    /// Stored status; re-derive against the clock before trusting it
    pub status: SubscriptionStatus,
    /// Start of the current term
    pub start_date: DateTime<Utc>,
    /// End of the current term
    pub end_date: DateTime<Utc>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub auto_renew: bool,
    pub payment_info: PaymentInfo,
    /// Append-only
    pub payment_history: Vec<PaymentEntry>,
    /// Entitlement snapshot taken when the plan was chosen
    pub features: FeatureSet,
    pub usage_stats: UsageStats,
    /// When the subscription was created
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether this subscription currently grants entitlements
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.status.grants_access() && self.end_date > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            SubscriptionStatus::Pending,
            SubscriptionStatus::Active,
            SubscriptionStatus::Trialing,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Expired,
            SubscriptionStatus::Suspended,
        ] {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_usage_stats_record() {
        let now = Utc::now();
        let mut stats = UsageStats::default();
        stats.record(ResourceKind::Trip, now);
        stats.record(ResourceKind::AiConsultation, now);
        stats.record(ResourceKind::AiConsultation, now);
        assert_eq!(stats.trips_created, 1);
        assert_eq!(stats.ai_consultations_used, 2);
        assert_eq!(stats.last_used_at, Some(now));
    }
}
