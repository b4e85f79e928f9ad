//! Database row models
//!
//! Rows are read back with every column later lookups depend on, so an
//! album row always carries its `artist_id` and a track row its
//! `artist_id` and `album_id`.

use serde::{Deserialize, Serialize};

/// Row of `artists`, `albums` or `tracks`
///
/// Foreign keys a table doesn't have are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EntityRow {
    pub id: i64,
    pub name: String,
    pub mbid: String,
    pub artist_id: Option<i64>,
    pub album_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayRow {
    pub id: i64,
    pub user_id: i64,
    pub track_id: i64,
    /// Unix seconds
    pub date: i64,
}
