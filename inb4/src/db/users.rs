//! User persistence

use inb4_common::db::UserRow;
use inb4_common::{Error, Result};
use sqlx::SqlitePool;

pub async fn find_user(pool: &SqlitePool, name: &str) -> Result<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, name FROM users WHERE name = ? ORDER BY id LIMIT 1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Find the user row, inserting it first if needed
///
/// Nothing in the schema keeps names unique; two racing inserts both
/// land and every later lookup settles on the lower id.
pub async fn find_or_create_user(pool: &SqlitePool, name: &str) -> Result<UserRow> {
    if let Some(user) = find_user(pool, name).await? {
        return Ok(user);
    }

    sqlx::query("INSERT INTO users (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;

    find_user(pool, name)
        .await?
        .ok_or_else(|| Error::Internal(format!("user '{}' missing after insert", name)))
}
