//! Play insertion
//!
//! [`PlayStore::add_play`] resolves rows in foreign-key order
//! (artist → album → track → user) and then inserts the play. A failure
//! part way leaves the rows created so far in place; calling again with
//! the same play reuses them.

use super::entities::{self, EntityTable, NewEntity};
use super::users;
use crate::types::Play;
use inb4_common::db::{PlayRow, UserRow};
use inb4_common::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Writes plays into the store
///
/// Owns a name → row cache of users resolved during this run. The cache
/// lives as long as the store value and is never invalidated.
pub struct PlayStore {
    pool: SqlitePool,
    users: HashMap<String, UserRow>,
}

impl PlayStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            users: HashMap::new(),
        }
    }

    /// Store one play, creating its artist, album, track and user as needed
    ///
    /// Returns the id of the new `plays` row.
    pub async fn add_play(&mut self, play: &Play) -> Result<i64> {
        let track = match entities::find(&self.pool, EntityTable::Tracks, &play.track).await? {
            Some(track) => track,
            None => {
                let artist = entities::find_or_create(&self.pool, &NewEntity::artist(&play.artist)).await?;
                let album =
                    entities::find_or_create(&self.pool, &NewEntity::album(&play.album, artist.id)).await?;
                entities::find_or_create(&self.pool, &NewEntity::track(&play.track, artist.id, album.id))
                    .await?
            }
        };

        let user = self.user(&play.user).await?;

        insert_play(&self.pool, user.id, track.id, play.date).await
    }

    /// Memoized user lookup
    async fn user(&mut self, name: &str) -> Result<UserRow> {
        if let Some(user) = self.users.get(name) {
            return Ok(user.clone());
        }

        let user = users::find_or_create_user(&self.pool, name).await?;
        self.users.insert(name.to_string(), user.clone());
        Ok(user)
    }
}

pub async fn insert_play(pool: &SqlitePool, user_id: i64, track_id: i64, date: i64) -> Result<i64> {
    let result = sqlx::query("INSERT INTO plays (user_id, track_id, date) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(track_id)
        .bind(date)
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Plays of one user, oldest first
pub async fn plays_for_user(pool: &SqlitePool, user: &str) -> Result<Vec<PlayRow>> {
    let rows = sqlx::query_as::<_, PlayRow>(
        r#"
        SELECT plays.id, plays.user_id, plays.track_id, plays.date
        FROM plays
        JOIN users ON users.id = plays.user_id
        WHERE users.name = ?
        ORDER BY plays.date, plays.id
        "#,
    )
    .bind(user)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityInfo;
    use inb4_common::db::init_memory_database;

    fn play(user: &str, date: i64) -> Play {
        Play {
            user: user.to_string(),
            date,
            track: EntityInfo::new("Sunflower", "t-1"),
            artist: EntityInfo::new("Low", "a-1"),
            album: EntityInfo::new("Things We Lost in the Fire", "b-1"),
        }
    }

    async fn table_counts(pool: &SqlitePool) -> [i64; 5] {
        let mut counts = [0; 5];
        for (i, table) in ["artists", "albums", "tracks", "users", "plays"].iter().enumerate() {
            counts[i] = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(pool)
                .await
                .unwrap();
        }
        counts
    }

    #[tokio::test]
    async fn test_first_play_creates_one_row_per_table() {
        let pool = init_memory_database().await.unwrap();
        let mut store = PlayStore::new(pool.clone());

        store.add_play(&play("alice", 100)).await.unwrap();

        assert_eq!(table_counts(&pool).await, [1, 1, 1, 1, 1]);
    }

    #[tokio::test]
    async fn test_repeat_play_only_adds_play_row() {
        let pool = init_memory_database().await.unwrap();
        let mut store = PlayStore::new(pool.clone());

        let first = store.add_play(&play("alice", 100)).await.unwrap();
        let second = store.add_play(&play("alice", 200)).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(table_counts(&pool).await, [1, 1, 1, 1, 2]);
    }

    #[tokio::test]
    async fn test_play_row_references_resolved_rows() {
        let pool = init_memory_database().await.unwrap();
        let mut store = PlayStore::new(pool.clone());

        store.add_play(&play("alice", 100)).await.unwrap();

        let (artist, album_artist, track_artist): (String, i64, i64) = sqlx::query_as(
            r#"
            SELECT artists.name, albums.artist_id, tracks.artist_id
            FROM plays
            JOIN tracks ON tracks.id = plays.track_id
            JOIN albums ON albums.id = tracks.album_id
            JOIN artists ON artists.id = tracks.artist_id
            "#,
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(artist, "Low");
        assert_eq!(album_artist, track_artist);

        let rows = plays_for_user(&pool, "alice").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, 100);
    }

    #[tokio::test]
    async fn test_second_user_same_track() {
        let pool = init_memory_database().await.unwrap();
        let mut store = PlayStore::new(pool.clone());

        store.add_play(&play("alice", 100)).await.unwrap();
        store.add_play(&play("bob", 150)).await.unwrap();

        assert_eq!(table_counts(&pool).await, [1, 1, 1, 2, 2]);
    }

    #[tokio::test]
    async fn test_known_track_skips_artist_and_album_resolution() {
        let pool = init_memory_database().await.unwrap();
        let mut store = PlayStore::new(pool.clone());
        store.add_play(&play("alice", 100)).await.unwrap();

        // Same track mbid credited differently upstream
        let mut variant = play("alice", 300);
        variant.artist = EntityInfo::named("Low feat. Someone");
        variant.album = EntityInfo::named("Single");
        store.add_play(&variant).await.unwrap();

        assert_eq!(table_counts(&pool).await, [1, 1, 1, 1, 2]);
    }

    #[tokio::test]
    async fn test_users_resolved_once_per_store() {
        let pool = init_memory_database().await.unwrap();
        let mut store = PlayStore::new(pool.clone());
        store.add_play(&play("alice", 100)).await.unwrap();

        // A store that looked alice up again would insert a fresh row here
        sqlx::query("UPDATE users SET name = 'alice-renamed' WHERE name = 'alice'")
            .execute(&pool)
            .await
            .unwrap();
        store.add_play(&play("alice", 200)).await.unwrap();

        assert_eq!(table_counts(&pool).await, [1, 1, 1, 1, 2]);

        // A new store starts with an empty cache
        let mut fresh = PlayStore::new(pool.clone());
        fresh.add_play(&play("alice", 300)).await.unwrap();
        assert_eq!(table_counts(&pool).await, [1, 1, 1, 2, 3]);
    }
}
