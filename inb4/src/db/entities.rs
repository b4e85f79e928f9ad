//! Artist, album and track persistence
//!
//! Rows are identified by `mbid` when one is known and by `name`
//! otherwise. [`find_or_create`] never trusts the id an insert reports:
//! it looks the row up again, and the lowest matching id wins, so two
//! writers racing on the same entity both end up with the same row.

use crate::types::{EntityInfo, IdentityKey};
use inb4_common::db::EntityRow;
use inb4_common::{Error, Result};
use sqlx::SqlitePool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityTable {
    Artists,
    Albums,
    Tracks,
}

impl EntityTable {
    pub fn name(self) -> &'static str {
        match self {
            EntityTable::Artists => "artists",
            EntityTable::Albums => "albums",
            EntityTable::Tracks => "tracks",
        }
    }

    /// Every column later lookups need; absent foreign keys read as NULL
    fn select_columns(self) -> &'static str {
        match self {
            EntityTable::Artists => "id, name, mbid, NULL AS artist_id, NULL AS album_id",
            EntityTable::Albums => "id, name, mbid, artist_id, NULL AS album_id",
            EntityTable::Tracks => "id, name, mbid, artist_id, album_id",
        }
    }
}

/// Values to insert when an entity doesn't exist yet
#[derive(Debug, Clone, Copy)]
pub struct NewEntity<'a> {
    pub table: EntityTable,
    pub info: &'a EntityInfo,
    pub artist_id: Option<i64>,
    pub album_id: Option<i64>,
}

impl<'a> NewEntity<'a> {
    pub fn artist(info: &'a EntityInfo) -> Self {
        Self {
            table: EntityTable::Artists,
            info,
            artist_id: None,
            album_id: None,
        }
    }

    pub fn album(info: &'a EntityInfo, artist_id: i64) -> Self {
        Self {
            table: EntityTable::Albums,
            info,
            artist_id: Some(artist_id),
            album_id: None,
        }
    }

    pub fn track(info: &'a EntityInfo, artist_id: i64, album_id: i64) -> Self {
        Self {
            table: EntityTable::Tracks,
            info,
            artist_id: Some(artist_id),
            album_id: Some(album_id),
        }
    }
}

/// Look up the canonical row for `info`
pub async fn find(pool: &SqlitePool, table: EntityTable, info: &EntityInfo) -> Result<Option<EntityRow>> {
    let (column, value) = match info.identity() {
        IdentityKey::Mbid(mbid) => ("mbid", mbid),
        IdentityKey::Name(name) => ("name", name),
    };

    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ? ORDER BY id LIMIT 1",
        table.select_columns(),
        table.name(),
        column
    );

    let row = sqlx::query_as::<_, EntityRow>(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Find the row for `entity`, inserting it first if there is none
///
/// An existing row is returned as stored; its name is not updated.
pub async fn find_or_create(pool: &SqlitePool, entity: &NewEntity<'_>) -> Result<EntityRow> {
    if let Some(row) = find(pool, entity.table, entity.info).await? {
        return Ok(row);
    }

    insert(pool, entity).await?;

    find(pool, entity.table, entity.info).await?.ok_or_else(|| {
        Error::Internal(format!(
            "{} row for '{}' missing after insert",
            entity.table.name(),
            entity.info.name
        ))
    })
}

async fn insert(pool: &SqlitePool, entity: &NewEntity<'_>) -> Result<()> {
    let name = entity.info.name.as_str();
    let mbid = entity.info.mbid_column();

    let query = match entity.table {
        EntityTable::Artists => sqlx::query("INSERT INTO artists (name, mbid) VALUES (?, ?)")
            .bind(name)
            .bind(mbid),
        EntityTable::Albums => {
            let artist_id = required(entity.artist_id, "albums", "artist_id")?;
            sqlx::query("INSERT INTO albums (name, mbid, artist_id) VALUES (?, ?, ?)")
                .bind(name)
                .bind(mbid)
                .bind(artist_id)
        }
        EntityTable::Tracks => {
            let artist_id = required(entity.artist_id, "tracks", "artist_id")?;
            let album_id = required(entity.album_id, "tracks", "album_id")?;
            sqlx::query("INSERT INTO tracks (name, mbid, artist_id, album_id) VALUES (?, ?, ?, ?)")
                .bind(name)
                .bind(mbid)
                .bind(artist_id)
                .bind(album_id)
        }
    };

    query.execute(pool).await?;

    tracing::debug!(table = entity.table.name(), name = %name, mbid = %mbid, "Inserted entity");

    Ok(())
}

fn required(value: Option<i64>, table: &str, column: &str) -> Result<i64> {
    value.ok_or_else(|| Error::InvalidInput(format!("{} insert needs {}", table, column)))
}
