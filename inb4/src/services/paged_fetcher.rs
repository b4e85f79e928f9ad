//! Per-user paginated track retrieval
//!
//! Fetches every `user.getRecentTracks` page of one user for one date
//! range. Pages already in the cache are read back without touching the
//! rate limiter; missing pages are fetched under the limiter and their
//! response bodies cached as received, as soon as they arrive, so a
//! failed run leaves them for the next one.

use crate::cache::{CacheError, CacheKey, ResponseCache};
use crate::error::{FetchError, PageRef};
use crate::lastfm::{ListeningHistoryApi, RecentTracksPage};
use crate::rate_limiter::RateLimiter;
use crate::types::Scrobble;
use futures::future::try_join_all;
use inb4_common::DateRange;
use serde::Deserialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Cache prefix of raw pages; the user name is appended
pub const TRACK_PAGE_PREFIX: &str = "trackpage";

/// Cache key of one raw page
pub fn track_page_key(user: &str, page: u32, range: &DateRange) -> CacheKey {
    CacheKey::new(format!("{}.{}", TRACK_PAGE_PREFIX, user), page, range)
}

pub struct PagedFetcher {
    api: Arc<dyn ListeningHistoryApi>,
    cache: ResponseCache,
    limiter: Arc<RateLimiter>,
}

impl PagedFetcher {
    pub fn new(
        api: Arc<dyn ListeningHistoryApi>,
        cache: ResponseCache,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self { api, cache, limiter }
    }

    /// All finalized listens of `user` in `range`, oldest page first
    ///
    /// Pages are requested concurrently but concatenated in page order.
    /// Now-playing records are dropped. Any failing page fails the whole
    /// call; nothing partial is returned.
    pub async fn fetch_user_tracks(
        &self,
        user: &str,
        range: &DateRange,
    ) -> Result<Vec<Scrobble>, FetchError> {
        info!(user = %user, "Getting tracks");

        let page_count = self.fetch_page_count(user, range).await?;
        info!(user = %user, page_count, "Found pages");

        if page_count == 0 {
            return Ok(Vec::new());
        }

        let completed = AtomicU32::new(0);
        let pages = try_join_all(
            (1..=page_count).map(|page| self.load_page(user, range, page, page_count, &completed)),
        )
        .await?;

        let tracks: Vec<Scrobble> = pages
            .into_iter()
            .flat_map(|page| page.recenttracks.track)
            .filter_map(|track| track.into_scrobble())
            .collect();

        info!(user = %user, tracks = tracks.len(), "Found tracks");

        Ok(tracks)
    }

    async fn fetch_page_count(&self, user: &str, range: &DateRange) -> Result<u32, FetchError> {
        self.limiter.acquire().await;

        let first = self
            .api
            .recent_tracks(user, range, None)
            .await
            .map_err(|source| FetchError::Tracks {
                user: user.to_string(),
                page: PageRef::Count,
                source,
            })?;

        Ok(first.data.total_pages())
    }

    async fn load_page(
        &self,
        user: &str,
        range: &DateRange,
        page: u32,
        page_count: u32,
        completed: &AtomicU32,
    ) -> Result<RecentTracksPage, FetchError> {
        let key = track_page_key(user, page, range);

        let cached = if self.cache.has(&key).await {
            match self.cache.read::<serde_json::Value>(&key).await? {
                Some(body) => Some(RecentTracksPage::deserialize(&body).map_err(|source| {
                    CacheError::Corrupt {
                        location: self.cache.location(&key),
                        source,
                    }
                })?),
                None => None,
            }
        } else {
            None
        };

        let loaded = match cached {
            Some(cached) => {
                debug!(user = %user, page, "Using cached page");
                cached
            }
            None => {
                self.limiter.acquire().await;

                let fetched = self
                    .api
                    .recent_tracks(user, range, Some(page))
                    .await
                    .map_err(|source| FetchError::Tracks {
                        user: user.to_string(),
                        page: PageRef::Number(page),
                        source,
                    })?;

                self.cache.write(&key, &fetched.body).await?;
                fetched.data
            }
        };

        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        info!(user = %user, "Requesting tracks [{}/{}]", done, page_count);

        Ok(loaded)
    }
}
