//! Subscription status derivation

use chrono::{DateTime, Utc};
use roadtrip_types::{Subscription, SubscriptionStatus};

/// Re-derive a subscription's status from its dates.
///
/// Canceled and suspended records keep their status; a canceled record
/// missing `canceled_at` gets it stamped. Everything else becomes trialing
/// while the trial runs, expired once `end_date` has passed, active otherwise.
pub fn normalize_status(mut subscription: Subscription, now: DateTime<Utc>) -> Subscription {
    if subscription.status.is_sticky() {
        if subscription.status == SubscriptionStatus::Canceled && subscription.canceled_at.is_none() {
            subscription.canceled_at = Some(now);
        }
        return subscription;
    }

    subscription.status = if subscription.trial_ends_at.is_some_and(|t| t > now) {
        SubscriptionStatus::Trialing
    } else if subscription.end_date < now {
        SubscriptionStatus::Expired
    } else {
        SubscriptionStatus::Active
    };
    subscription
}

/// The subscription currently granting entitlements.
///
/// Ties go to the latest `start_date`, then the latest `created_at`, then
/// the highest id.
pub fn select_current(subscriptions: &[Subscription], now: DateTime<Utc>) -> Option<&Subscription> {
    subscriptions
        .iter()
        .filter(|s| s.is_current(now))
        .max_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use roadtrip_types::{PaymentInfo, Plan, SubscriptionId, UsageStats, UserId};

    use crate::catalog::default_features;

    fn subscription(status: SubscriptionStatus, end_in: Duration) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: SubscriptionId::new(),
            user_id: UserId::new(),
            plan: Plan::Free,
            status,
            start_date: now - Duration::days(10),
            end_date: now + end_in,
            trial_ends_at: None,
            canceled_at: None,
            cancel_reason: None,
            auto_renew: true,
            payment_info: PaymentInfo::default(),
            payment_history: Vec::new(),
            features: default_features(Plan::Free),
            usage_stats: UsageStats::default(),
            created_at: now - Duration::days(10),
            updated_at: now - Duration::days(10),
        }
    }

    #[test]
    fn test_active_past_end_becomes_expired() {
        let now = Utc::now();
        let sub = normalize_status(subscription(SubscriptionStatus::Active, Duration::days(-1)), now);
        assert_eq!(sub.status, SubscriptionStatus::Expired);
    }

    #[test]
    fn test_trial_in_future_becomes_trialing() {
        let now = Utc::now();
        let mut sub = subscription(SubscriptionStatus::Active, Duration::days(20));
        sub.trial_ends_at = Some(now + Duration::days(3));
        assert_eq!(normalize_status(sub, now).status, SubscriptionStatus::Trialing);
    }

    #[test]
    fn test_past_due_within_term_becomes_active() {
        let now = Utc::now();
        let sub = normalize_status(subscription(SubscriptionStatus::PastDue, Duration::days(5)), now);
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[test]
    fn test_sticky_statuses_kept() {
        let now = Utc::now();
        let sub = normalize_status(subscription(SubscriptionStatus::Canceled, Duration::days(5)), now);
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
        assert_eq!(sub.canceled_at, Some(now));

        let sub = normalize_status(subscription(SubscriptionStatus::Suspended, Duration::days(-5)), now);
        assert_eq!(sub.status, SubscriptionStatus::Suspended);
    }

    #[test]
    fn test_canceled_at_stamped_once() {
        let now = Utc::now();
        let earlier = now - Duration::days(2);
        let mut sub = subscription(SubscriptionStatus::Canceled, Duration::days(5));
        sub.canceled_at = Some(earlier);
        assert_eq!(normalize_status(sub, now).canceled_at, Some(earlier));
    }

    #[test]
    fn test_select_current_prefers_latest_start() {
        let now = Utc::now();
        let older = subscription(SubscriptionStatus::Active, Duration::days(5));
        let mut newer = subscription(SubscriptionStatus::Active, Duration::days(5));
        newer.start_date = now - Duration::days(1);
        let expired = subscription(SubscriptionStatus::Active, Duration::days(-1));

        let subs = vec![older, newer.clone(), expired];
        assert_eq!(select_current(&subs, now).map(|s| s.id), Some(newer.id));
    }

    #[test]
    fn test_select_current_ignores_canceled() {
        let now = Utc::now();
        let subs = vec![subscription(SubscriptionStatus::Canceled, Duration::days(5))];
        assert!(select_current(&subs, now).is_none());
    }
}
