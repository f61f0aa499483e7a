//! Quota gate behaviour, including concurrent creation

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::TestEngine;
use roadtrip_db::{Collection, Store};
use roadtrip_subscription_core::{EngineConfig, EngineError};
use roadtrip_types::{Plan, QuotaDecision, ResourceKind};

#[tokio::test]
async fn test_free_plan_fourth_trip_denied() {
    let t = TestEngine::new();
    let user_id = t.account().await.user.id;

    for i in 1..=3 {
        t.engine
            .quota()
            .create_resource(user_id, ResourceKind::Trip, Some(format!("Trip {i}")))
            .await
            .unwrap();
    }

    let err = t
        .engine
        .quota()
        .create_resource(user_id, ResourceKind::Trip, Some("Trip 4".into()))
        .await
        .unwrap_err();

    match err {
        EngineError::QuotaExceeded {
            feature,
            limit,
            current,
            plan,
        } => {
            assert_eq!(feature, "maxTrips");
            assert_eq!(limit, 3);
            assert_eq!(current, 3);
            assert_eq!(plan, Plan::Free);
        }
        other => panic!("expected QuotaExceeded, got {other:?}"),
    }
    assert_eq!(t.count(user_id, Collection::Trips).await, 3);
}

#[tokio::test]
async fn test_quota_boundary() {
    let t = TestEngine::new();
    let user_id = t.account().await.user.id;

    t.seed_resources(user_id, ResourceKind::Trip, 2, Utc::now()).await;
    let decision = t.engine.quota().check_quota(user_id, ResourceKind::Trip).await.unwrap();
    assert_eq!(decision, QuotaDecision::Allow { limit: 3, current: 2 });

    t.seed_resources(user_id, ResourceKind::Trip, 1, Utc::now()).await;
    let decision = t.engine.quota().check_quota(user_id, ResourceKind::Trip).await.unwrap();
    match decision {
        QuotaDecision::Deny {
            reason,
            feature,
            limit,
            current,
        } => {
            assert_eq!(feature, "maxTrips");
            assert_eq!((limit, current), (3, 3));
            assert!(reason.contains("free"));
        }
        other => panic!("expected Deny, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rolling_window_ignores_old_consultations() {
    let t = TestEngine::new();
    let user_id = t.account().await.user.id;

    t.seed_resources(user_id, ResourceKind::AiConsultation, 5, Utc::now() - Duration::hours(25))
        .await;
    let decision = t
        .engine
        .quota()
        .check_quota(user_id, ResourceKind::AiConsultation)
        .await
        .unwrap();
    assert_eq!(decision, QuotaDecision::Allow { limit: 1, current: 0 });

    t.seed_resources(user_id, ResourceKind::AiConsultation, 1, Utc::now() - Duration::hours(1))
        .await;
    let decision = t
        .engine
        .quota()
        .check_quota(user_id, ResourceKind::AiConsultation)
        .await
        .unwrap();
    assert!(!decision.is_allowed());
}

#[tokio::test]
async fn test_trips_count_over_lifetime() {
    let t = TestEngine::new();
    let user_id = t.account().await.user.id;

    t.seed_resources(user_id, ResourceKind::Trip, 3, Utc::now() - Duration::days(400)).await;
    let decision = t.engine.quota().check_quota(user_id, ResourceKind::Trip).await.unwrap();
    assert!(!decision.is_allowed());
}

#[tokio::test]
async fn test_upgrade_raises_limit() {
    let t = TestEngine::new();
    let user_id = t.account().await.user.id;
    t.seed_resources(user_id, ResourceKind::Trip, 3, Utc::now()).await;

    t.engine
        .subscriptions()
        .change_plan(user_id, "standard", Some("card"))
        .await
        .unwrap();

    t.engine
        .quota()
        .create_resource(user_id, ResourceKind::Trip, None)
        .await
        .unwrap();
    assert_eq!(t.count(user_id, Collection::Trips).await, 4);
}

#[tokio::test]
async fn test_canceled_user_requires_subscription() {
    let t = TestEngine::new();
    let user_id = t.account().await.user.id;
    t.engine
        .subscriptions()
        .cancel_subscription(user_id, None)
        .await
        .unwrap();

    let err = t
        .engine
        .quota()
        .create_resource(user_id, ResourceKind::Trip, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SubscriptionRequired));
    assert_eq!(err.status_code(), 402);
}

#[tokio::test]
async fn test_check_and_reserve_in_caller_transaction() {
    let t = TestEngine::new();
    let user_id = t.account().await.user.id;

    let mut tx = t.store.begin().await.unwrap();
    let decision = t
        .engine
        .quota()
        .check_and_reserve(tx.as_mut(), user_id, ResourceKind::Trip)
        .await
        .unwrap();
    assert!(decision.is_allowed());
    tx.rollback().await.unwrap();
}

fn position(calls: &[&'static str], call: &str) -> usize {
    calls
        .iter()
        .position(|c| *c == call)
        .unwrap_or_else(|| panic!("{call} not called in {calls:?}"))
}

#[tokio::test]
async fn test_create_resource_counts_under_quota_lock() {
    let t = TestEngine::new();
    let user_id = t.account().await.user.id;

    for (kind, count) in [
        (ResourceKind::Trip, "count_by_owner"),
        (ResourceKind::AiConsultation, "count_by_owner_since"),
    ] {
        t.engine
            .quota()
            .create_resource(user_id, kind, None)
            .await
            .unwrap();

        let calls = t.store.last_trace_with("insert_resource").unwrap();
        assert_eq!(calls[0], "lock_user");
        assert!(position(&calls, "lock_user") < position(&calls, "lock_quota"));
        assert!(position(&calls, "lock_quota") < position(&calls, "subscriptions_for_user"));
        assert!(position(&calls, "lock_quota") < position(&calls, count));
        assert!(position(&calls, count) < position(&calls, "insert_resource"));
        assert!(position(&calls, "insert_resource") < position(&calls, "update_subscription"));
    }
}

#[tokio::test]
async fn test_check_and_reserve_takes_both_locks() {
    let t = TestEngine::new();
    let user_id = t.account().await.user.id;

    let mut tx = t.store.begin().await.unwrap();
    t.engine
        .quota()
        .check_and_reserve(tx.as_mut(), user_id, ResourceKind::AiConsultation)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let calls = t.store.last_trace_with("lock_quota").unwrap();
    assert!(position(&calls, "lock_user") < position(&calls, "lock_quota"));
    assert!(position(&calls, "lock_quota") < position(&calls, "count_by_owner_since"));
}

#[tokio::test]
async fn test_check_quota_locks_user_before_reading() {
    let t = TestEngine::new();
    let user_id = t.account().await.user.id;

    t.engine
        .quota()
        .check_quota(user_id, ResourceKind::Trip)
        .await
        .unwrap();

    let calls = t.store.committed_calls().pop().unwrap();
    assert_eq!(calls[0], "lock_user");
    assert!(position(&calls, "lock_user") < position(&calls, "subscriptions_for_user"));
}

#[tokio::test]
async fn test_oversized_ai_window_counts_everything() {
    let t = TestEngine::with_config(
        EngineConfig::default().with_ai_consultation_window(Duration::MAX),
    );
    let user_id = t.account().await.user.id;
    t.seed_resources(
        user_id,
        ResourceKind::AiConsultation,
        1,
        Utc::now() - Duration::days(3650),
    )
    .await;

    let decision = t
        .engine
        .quota()
        .check_quota(user_id, ResourceKind::AiConsultation)
        .await
        .unwrap();
    assert!(matches!(decision, QuotaDecision::Deny { limit: 1, current: 1, .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creation_never_exceeds_limit() {
    let t = Arc::new(TestEngine::new());
    let user_id = t.account().await.user.id;

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let t = Arc::clone(&t);
            tokio::spawn(async move {
                t.engine
                    .quota()
                    .create_resource(user_id, ResourceKind::Trip, Some(format!("Race {i}")))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    let mut denied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(EngineError::QuotaExceeded { .. }) => denied += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(created, 3);
    assert_eq!(denied, 9);
    assert_eq!(t.count(user_id, Collection::Trips).await, 3);
}
