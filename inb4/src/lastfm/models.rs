//! Last.fm JSON response models
//!
//! Decodes the fields the importer uses; the raw body travels alongside
//! in [`RawResponse`]. Last.fm quirks handled here:
//! - a list with a single element is sent as a bare object
//! - numeric fields are usually sent as strings
//! - `mbid` may be missing, empty or null
//! - with no tracks in range, paging metadata sits directly on
//!   `recenttracks` instead of under `@attr`

use crate::types::{EntityInfo, ListenState, Scrobble};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

/// A decoded response together with the JSON body it came from
///
/// The body is what gets cached, so fields the models don't declare
/// survive in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse<T> {
    pub body: serde_json::Value,
    pub data: T,
}

impl<T: DeserializeOwned> RawResponse<T> {
    pub fn from_body(body: serde_json::Value) -> Result<Self, serde_json::Error> {
        let data = T::deserialize(&body)?;
        Ok(Self { body, data })
    }
}

impl<T: Serialize> RawResponse<T> {
    /// Response whose body is `data` as serialized by the models
    pub fn from_data(data: T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_value(&data)?;
        Ok(Self { body, data })
    }
}

/// Response of `user.getRecentTracks`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RecentTracksPage {
    pub recenttracks: RecentTracks,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RecentTracks {
    #[serde(default, deserialize_with = "one_or_many")]
    pub track: Vec<RawTrack>,
    #[serde(rename = "@attr", default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<PageAttr>,
    /// Present instead of `@attr` when the range holds no tracks
    #[serde(
        rename = "totalPages",
        default,
        deserialize_with = "opt_u32_from_any",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_pages: Option<u32>,
}

/// Paging metadata (`@attr`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PageAttr {
    #[serde(default, deserialize_with = "u32_from_any")]
    pub page: u32,
    #[serde(rename = "perPage", default, deserialize_with = "u32_from_any")]
    pub per_page: u32,
    #[serde(rename = "totalPages", default, deserialize_with = "u32_from_any")]
    pub total_pages: u32,
    #[serde(default, deserialize_with = "u32_from_any")]
    pub total: u32,
}

/// Track record as sent by Last.fm
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawTrack {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub mbid: String,
    #[serde(default)]
    pub artist: RawEntity,
    #[serde(default)]
    pub album: RawEntity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<RawDate>,
    #[serde(rename = "@attr", default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<TrackAttr>,
}

/// Artist or album reference inside a track record
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawEntity {
    #[serde(rename = "#text", default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub mbid: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawDate {
    #[serde(deserialize_with = "i64_from_any")]
    pub uts: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TrackAttr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nowplaying: Option<String>,
}

impl RecentTracksPage {
    pub fn new(tracks: Vec<RawTrack>, page: u32, total_pages: u32) -> Self {
        Self {
            recenttracks: RecentTracks {
                attr: Some(PageAttr {
                    page,
                    per_page: tracks.len() as u32,
                    total_pages,
                    total: tracks.len() as u32,
                }),
                track: tracks,
                total_pages: None,
            },
        }
    }

    /// Page with no tracks, shaped the way Last.fm reports an empty range
    pub fn empty() -> Self {
        Self {
            recenttracks: RecentTracks {
                track: Vec::new(),
                attr: None,
                total_pages: Some(0),
            },
        }
    }

    pub fn total_pages(&self) -> u32 {
        self.recenttracks
            .attr
            .as_ref()
            .map(|attr| attr.total_pages)
            .or(self.recenttracks.total_pages)
            .unwrap_or(0)
    }
}

impl RawTrack {
    pub fn finalized(name: &str, artist: &str, album: &str, uts: i64) -> Self {
        Self {
            name: name.to_string(),
            mbid: String::new(),
            artist: RawEntity::named(artist),
            album: RawEntity::named(album),
            date: Some(RawDate { uts }),
            attr: None,
        }
    }

    pub fn now_playing(name: &str, artist: &str, album: &str) -> Self {
        Self {
            name: name.to_string(),
            mbid: String::new(),
            artist: RawEntity::named(artist),
            album: RawEntity::named(album),
            date: None,
            attr: Some(TrackAttr {
                nowplaying: Some("true".to_string()),
            }),
        }
    }

    pub fn with_mbid(mut self, mbid: &str) -> Self {
        self.mbid = mbid.to_string();
        self
    }

    fn is_now_playing(&self) -> bool {
        self.attr
            .as_ref()
            .and_then(|attr| attr.nowplaying.as_deref())
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }

    /// A record is finalized only when it has a timestamp and no
    /// now-playing marker
    pub fn listen_state(&self) -> ListenState {
        match &self.date {
            Some(date) if !self.is_now_playing() => ListenState::Finalized {
                timestamp: date.uts,
            },
            _ => ListenState::InProgress,
        }
    }

    /// `None` for in-progress records
    pub fn into_scrobble(self) -> Option<Scrobble> {
        match self.listen_state() {
            ListenState::Finalized { timestamp } => Some(Scrobble {
                track: EntityInfo::new(self.name, self.mbid),
                artist: self.artist.into_info(),
                album: self.album.into_info(),
                timestamp,
            }),
            ListenState::InProgress => None,
        }
    }
}

impl RawEntity {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mbid: String::new(),
        }
    }

    fn into_info(self) -> EntityInfo {
        EntityInfo::new(self.name, self.mbid)
    }
}

/// Response of `group.getMembers`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GroupMembersPage {
    pub members: GroupMembers,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GroupMembers {
    #[serde(default, deserialize_with = "one_or_many")]
    pub user: Vec<GroupMember>,
    #[serde(rename = "@attr", default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<PageAttr>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GroupMember {
    pub name: String,
}

impl GroupMembersPage {
    pub fn new(names: &[&str], page: u32, total_pages: u32) -> Self {
        Self {
            members: GroupMembers {
                user: names
                    .iter()
                    .map(|name| GroupMember {
                        name: name.to_string(),
                    })
                    .collect(),
                attr: Some(PageAttr {
                    page,
                    per_page: names.len() as u32,
                    total_pages,
                    total: names.len() as u32,
                }),
            },
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.user.iter().map(|member| member.name.as_str())
    }

    /// Member lists without paging metadata are a single page
    pub fn total_pages(&self) -> u32 {
        self.members
            .attr
            .as_ref()
            .map(|attr| attr.total_pages)
            .unwrap_or(1)
    }
}

/// `{"error": 6, "message": "..."}` envelope returned with HTTP 200
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
        None => Vec::new(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(i64),
    Text(String),
}

fn i64_from_any<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(text) => text
            .trim()
            .parse()
            .map_err(|e| de::Error::custom(format!("invalid number '{}': {}", text, e))),
    }
}

fn u32_from_any<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = i64_from_any(deserializer)?;
    u32::try_from(value).map_err(|_| de::Error::custom(format!("out of range: {}", value)))
}

fn opt_u32_from_any<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    u32_from_any(deserializer).map(Some)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
