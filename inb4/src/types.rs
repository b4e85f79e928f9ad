//! Core types shared by the fetch and storage layers
//!
//! A fetched Last.fm track is either a finished listen or the "now playing"
//! placeholder. Only finished listens become [`Scrobble`]s, and each
//! scrobble becomes one [`Play`] when stored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-user finalized listens for one group and date range
pub type GroupTracks = BTreeMap<String, Vec<Scrobble>>;

/// State of a fetched track record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenState {
    /// Completed listen with its unix timestamp
    Finalized { timestamp: i64 },
    /// Track currently playing; has no timestamp yet
    InProgress,
}

/// Name plus optional MusicBrainz id of an artist, album or track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbid: Option<String>,
}

/// Column an entity is looked up by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKey<'a> {
    Mbid(&'a str),
    Name(&'a str),
}

impl EntityInfo {
    /// Blank mbids are stored as `None`
    pub fn new(name: impl Into<String>, mbid: impl Into<String>) -> Self {
        let mbid = mbid.into();
        let mbid = mbid.trim();
        Self {
            name: name.into(),
            mbid: (!mbid.is_empty()).then(|| mbid.to_string()),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mbid: None,
        }
    }

    /// mbid when present, name otherwise
    pub fn identity(&self) -> IdentityKey<'_> {
        match self.mbid.as_deref() {
            Some(mbid) if !mbid.is_empty() => IdentityKey::Mbid(mbid),
            _ => IdentityKey::Name(&self.name),
        }
    }

    /// Value for the `mbid` column ('' when absent)
    pub fn mbid_column(&self) -> &str {
        self.mbid.as_deref().unwrap_or_default()
    }
}

/// A finalized listen as returned by the fetchers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scrobble {
    pub track: EntityInfo,
    pub artist: EntityInfo,
    pub album: EntityInfo,
    /// Unix seconds
    pub timestamp: i64,
}

/// One listen by one user, ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Play {
    pub user: String,
    /// Unix seconds
    pub date: i64,
    pub track: EntityInfo,
    pub artist: EntityInfo,
    pub album: EntityInfo,
}

impl Play {
    pub fn from_scrobble(user: &str, scrobble: &Scrobble) -> Self {
        Self {
            user: user.to_string(),
            date: scrobble.timestamp,
            track: scrobble.track.clone(),
            artist: scrobble.artist.clone(),
            album: scrobble.album.clone(),
        }
    }
}
