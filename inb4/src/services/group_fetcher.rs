//! Whole-group track retrieval
//!
//! Resolves a group's members once per fetcher, then fetches members one
//! at a time: a member's fetch completes before the next one starts. The
//! per-user results and the combined result are both cached, keyed by the
//! date range.

use super::paged_fetcher::PagedFetcher;
use crate::cache::{CacheKey, ResponseCache};
use crate::error::FetchError;
use crate::lastfm::ListeningHistoryApi;
use crate::rate_limiter::RateLimiter;
use crate::types::{GroupTracks, Scrobble};
use inb4_common::DateRange;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Cache prefix of a whole group's result; suffix is the group name
pub const GROUP_TRACKS_PREFIX: &str = "grouptracks";
/// Cache prefix of one user's assembled result; suffix is the user name
pub const USER_TRACKS_PREFIX: &str = "usertracks";

pub struct GroupFetcher {
    api: Arc<dyn ListeningHistoryApi>,
    cache: ResponseCache,
    limiter: Arc<RateLimiter>,
    pages: PagedFetcher,
    members: Mutex<HashMap<String, Vec<String>>>,
}

impl GroupFetcher {
    pub fn new(
        api: Arc<dyn ListeningHistoryApi>,
        cache: ResponseCache,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        let pages = PagedFetcher::new(Arc::clone(&api), cache.clone(), Arc::clone(&limiter));

        Self {
            api,
            cache,
            limiter,
            pages,
            members: Mutex::new(HashMap::new()),
        }
    }

    /// Member names of `group`
    ///
    /// Resolved from the API on first use and memoized for the lifetime
    /// of this fetcher.
    pub async fn members(&self, group: &str) -> Result<Vec<String>, FetchError> {
        let mut known = self.members.lock().await;
        if let Some(members) = known.get(group) {
            return Ok(members.clone());
        }

        info!(group = %group, "Getting group members");

        let mut members = Vec::new();
        let mut page = 1;
        loop {
            self.limiter.acquire().await;
            let response = self
                .api
                .group_members(group, page)
                .await
                .map_err(|source| FetchError::Members {
                    group: group.to_string(),
                    page,
                    source,
                })?;

            members.extend(response.names().map(str::to_string));

            if page >= response.total_pages() {
                break;
            }
            page += 1;
        }

        info!(group = %group, count = members.len(), "Found member(s)");

        known.insert(group.to_string(), members.clone());
        Ok(members)
    }

    /// Finalized listens of every member of `group` in `range`
    ///
    /// The first failing member aborts the fetch; pages cached so far are
    /// kept for the next attempt.
    pub async fn fetch(&self, group: &str, range: &DateRange) -> Result<GroupTracks, FetchError> {
        info!(group = %group, range = %range, "Getting group tracks");

        let group_key = CacheKey::new(GROUP_TRACKS_PREFIX, group, range);
        if self.cache.has(&group_key).await {
            if let Some(cached) = self.cache.read::<GroupTracks>(&group_key).await? {
                info!(group = %group, "Returning cached group tracks");
                return Ok(cached);
            }
        }

        let members = self.members(group).await?;

        let mut group_tracks = GroupTracks::new();
        for user in members {
            let tracks = self.user_tracks(&user, range).await?;
            group_tracks.insert(user, tracks);
        }

        self.cache.write(&group_key, &group_tracks).await?;

        Ok(group_tracks)
    }

    /// One member's listens, via the user-scope cache
    async fn user_tracks(&self, user: &str, range: &DateRange) -> Result<Vec<Scrobble>, FetchError> {
        let user_key = CacheKey::new(USER_TRACKS_PREFIX, user, range);
        if self.cache.has(&user_key).await {
            if let Some(cached) = self.cache.read::<Vec<Scrobble>>(&user_key).await? {
                info!(user = %user, tracks = cached.len(), "Returning cached user tracks");
                return Ok(cached);
            }
        }

        let tracks = self.pages.fetch_user_tracks(user, range).await?;
        self.cache.write(&user_key, &tracks).await?;

        Ok(tracks)
    }
}
