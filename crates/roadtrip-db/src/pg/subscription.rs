//! Subscription queries

use sqlx::types::Json;
use sqlx::PgConnection;

use roadtrip_types::{Subscription, SubscriptionId, UserId};

use crate::error::{DbError, DbResult};
use crate::models::SubscriptionRow;

pub(super) async fn find_by_id(
    conn: &mut PgConnection,
    id: SubscriptionId,
) -> DbResult<Option<Subscription>> {
    let row = sqlx::query_as::<_, SubscriptionRow>(
        r#"
        SELECT id, user_id, plan, status, start_date, end_date, trial_ends_at,
               canceled_at, cancel_reason, auto_renew, payment_info, payment_history,
               features, usage_stats, created_at, updated_at
        FROM subscriptions
        WHERE id = $1
        "#,
    )
    .bind(id.0)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Subscription::try_from).transpose()
}

pub(super) async fn find_by_user_id(
    conn: &mut PgConnection,
    user_id: UserId,
) -> DbResult<Vec<Subscription>> {
    let rows = sqlx::query_as::<_, SubscriptionRow>(
        r#"
        SELECT id, user_id, plan, status, start_date, end_date, trial_ends_at,
               canceled_at, cancel_reason, auto_renew, payment_info, payment_history,
               features, usage_stats, created_at, updated_at
        FROM subscriptions
        WHERE user_id = $1
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(user_id.0)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Subscription::try_from).collect()
}

pub(super) async fn insert(conn: &mut PgConnection, sub: &Subscription) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO subscriptions (id, user_id, plan, status, start_date, end_date,
                                   trial_ends_at, canceled_at, cancel_reason, auto_renew,
                                   payment_info, payment_history, features, usage_stats,
                                   created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#,
    )
    .bind(sub.id.0)
    .bind(sub.user_id.0)
    .bind(sub.plan.as_str())
    .bind(sub.status.as_str())
    .bind(sub.start_date)
    .bind(sub.end_date)
    .bind(sub.trial_ends_at)
    .bind(sub.canceled_at)
    .bind(&sub.cancel_reason)
    .bind(sub.auto_renew)
    .bind(Json(&sub.payment_info))
    .bind(Json(&sub.payment_history))
    .bind(Json(&sub.features))
    .bind(Json(&sub.usage_stats))
    .bind(sub.created_at)
    .bind(sub.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from_insert(e, "subscriptions_pkey"))?;

    Ok(())
}

pub(super) async fn update(conn: &mut PgConnection, sub: &Subscription) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE subscriptions
        SET plan = $2, status = $3, start_date = $4, end_date = $5, trial_ends_at = $6,
            canceled_at = $7, cancel_reason = $8, auto_renew = $9, payment_info = $10,
            payment_history = $11, features = $12, usage_stats = $13, updated_at = $14
        WHERE id = $1
        "#,
    )
    .bind(sub.id.0)
    .bind(sub.plan.as_str())
    .bind(sub.status.as_str())
    .bind(sub.start_date)
    .bind(sub.end_date)
    .bind(sub.trial_ends_at)
    .bind(sub.canceled_at)
    .bind(&sub.cancel_reason)
    .bind(sub.auto_renew)
    .bind(Json(&sub.payment_info))
    .bind(Json(&sub.payment_history))
    .bind(Json(&sub.features))
    .bind(Json(&sub.usage_stats))
    .bind(sub.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
