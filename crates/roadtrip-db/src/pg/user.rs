//! User queries

use sqlx::PgConnection;

use roadtrip_types::{User, UserId};

use crate::error::{DbError, DbResult};
use crate::models::UserRow;

pub(super) async fn find_by_id(conn: &mut PgConnection, id: UserId) -> DbResult<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, email, first_name, last_name, role, privilege,
               active_subscription_id, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id.0)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(User::try_from).transpose()
}

pub(super) async fn find_by_email(conn: &mut PgConnection, email: &str) -> DbResult<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, email, first_name, last_name, role, privilege,
               active_subscription_id, created_at, updated_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(User::try_from).transpose()
}

pub(super) async fn lock(conn: &mut PgConnection, id: UserId) -> DbResult<bool> {
    let locked: Option<(uuid::Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id.0)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(locked.is_some())
}

pub(super) async fn insert(conn: &mut PgConnection, user: &User) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, first_name, last_name, role, privilege,
                           active_subscription_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(user.id.0)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.role.as_str())
    .bind(user.privilege.as_str())
    .bind(user.active_subscription.map(|s| s.0))
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from_insert(e, "users_email_key"))?;

    Ok(())
}

pub(super) async fn update(conn: &mut PgConnection, user: &User) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET email = $2, first_name = $3, last_name = $4, role = $5, privilege = $6,
            active_subscription_id = $7, updated_at = $8
        WHERE id = $1
        "#,
    )
    .bind(user.id.0)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.role.as_str())
    .bind(user.privilege.as_str())
    .bind(user.active_subscription.map(|s| s.0))
    .bind(user.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

pub(super) async fn delete(conn: &mut PgConnection, id: UserId) -> DbResult<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id.0)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}
