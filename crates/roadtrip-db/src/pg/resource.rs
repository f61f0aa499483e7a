//! Quota-limited resources and dependent record queries

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use roadtrip_types::{FavoriteRecord, PaymentRecord, ResourceKind, ResourceRecord, UserId};

use crate::error::{DbError, DbResult};
use crate::store::Collection;

pub(super) async fn lock_quota(
    conn: &mut PgConnection,
    user_id: UserId,
    kind: ResourceKind,
) -> DbResult<()> {
    // Released automatically at commit or rollback
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("{}:{}", user_id, kind))
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub(super) async fn count_by_owner(
    conn: &mut PgConnection,
    user_id: UserId,
    kind: ResourceKind,
) -> DbResult<u64> {
    count_owned(conn, user_id, Collection::for_resource(kind)).await
}

pub(super) async fn count_by_owner_since(
    conn: &mut PgConnection,
    user_id: UserId,
    kind: ResourceKind,
    since: DateTime<Utc>,
) -> DbResult<u64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE user_id = $1 AND created_at >= $2",
        Collection::for_resource(kind).as_str()
    );
    let (count,): (i64,) = sqlx::query_as(&sql)
        .bind(user_id.0)
        .bind(since)
        .fetch_one(&mut *conn)
        .await?;

    Ok(count.max(0) as u64)
}

pub(super) async fn insert(conn: &mut PgConnection, record: &ResourceRecord) -> DbResult<()> {
    let sql = format!(
        "INSERT INTO {} (id, user_id, title, created_at) VALUES ($1, $2, $3, $4)",
        Collection::for_resource(record.kind).as_str()
    );
    sqlx::query(&sql)
        .bind(record.id)
        .bind(record.owner.0)
        .bind(&record.title)
        .bind(record.created_at)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub(super) async fn insert_favorite(
    conn: &mut PgConnection,
    favorite: &FavoriteRecord,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO favorites (id, user_id, trip_id, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(favorite.id)
    .bind(favorite.user_id.0)
    .bind(favorite.trip_id)
    .bind(favorite.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from_insert(e, "favorites_user_id_trip_id_key"))?;

    Ok(())
}

pub(super) async fn insert_payment(
    conn: &mut PgConnection,
    payment: &PaymentRecord,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (id, user_id, subscription_id, amount_cents, currency,
                              status, transaction_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(payment.id)
    .bind(payment.user_id.0)
    .bind(payment.subscription_id.0)
    .bind(payment.amount_cents)
    .bind(&payment.currency)
    .bind(payment.status.as_str())
    .bind(&payment.transaction_id)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(super) async fn count_owned(
    conn: &mut PgConnection,
    user_id: UserId,
    collection: Collection,
) -> DbResult<u64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE user_id = $1",
        collection.as_str()
    );
    let (count,): (i64,) = sqlx::query_as(&sql)
        .bind(user_id.0)
        .fetch_one(&mut *conn)
        .await?;

    Ok(count.max(0) as u64)
}

pub(super) async fn delete_owned(
    conn: &mut PgConnection,
    user_id: UserId,
    collection: Collection,
) -> DbResult<u64> {
    let sql = format!("DELETE FROM {} WHERE user_id = $1", collection.as_str());
    let result = sqlx::query(&sql)
        .bind(user_id.0)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
