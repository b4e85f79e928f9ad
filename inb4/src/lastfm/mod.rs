//! Last.fm integration
//!
//! [`ListeningHistoryApi`] is the seam between the fetchers and the
//! network. [`LastFmClient`] implements it over HTTP; tests supply their
//! own implementations.

pub mod client;
pub mod models;

pub use client::{LastFmClient, LastFmError, LASTFM_BASE_URL};
pub use models::{GroupMembersPage, RawResponse, RawTrack, RecentTracksPage};

use async_trait::async_trait;
use inb4_common::DateRange;

/// Listening history source
///
/// Each call is one upstream request.
#[async_trait]
pub trait ListeningHistoryApi: Send + Sync {
    /// One page of a group's member list (pages start at 1)
    async fn group_members(&self, group: &str, page: u32) -> Result<GroupMembersPage, LastFmError>;

    /// A user's listens within `range`
    ///
    /// `page: None` asks for the first page; callers use it to learn the
    /// total page count.
    async fn recent_tracks(
        &self,
        user: &str,
        range: &DateRange,
        page: Option<u32>,
    ) -> Result<RawResponse<RecentTracksPage>, LastFmError>;
}
