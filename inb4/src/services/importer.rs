//! Import run
//!
//! Fetches a group's listening history and stores every finalized listen
//! as a play. Users are stored one after another, each user's plays in
//! the order Last.fm returned them.

use super::group_fetcher::GroupFetcher;
use crate::cache::ResponseCache;
use crate::db::PlayStore;
use crate::error::{ImportError, ImportResult};
use crate::lastfm::{LastFmClient, ListeningHistoryApi};
use crate::rate_limiter::RateLimiter;
use crate::types::Play;
use inb4_common::config::ImportConfig;
use inb4_common::DateRange;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

/// Plays are reported every this many inserts
const PROGRESS_INTERVAL: usize = 500;

/// Outcome of an import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub users: usize,
    pub plays: usize,
    /// Upstream requests made (cache hits excluded)
    pub requests: u64,
}

pub struct Importer {
    fetcher: GroupFetcher,
    store: PlayStore,
    limiter: Arc<RateLimiter>,
}

impl Importer {
    pub fn new(
        api: Arc<dyn ListeningHistoryApi>,
        cache: ResponseCache,
        limiter: Arc<RateLimiter>,
        pool: SqlitePool,
    ) -> Self {
        Self {
            fetcher: GroupFetcher::new(api, cache, Arc::clone(&limiter)),
            store: PlayStore::new(pool),
            limiter,
        }
    }

    pub async fn run(&mut self, group: &str, range: &DateRange) -> ImportResult<ImportSummary> {
        info!("Generating stats for period {}", range);

        let requests_before = self.limiter.acquired();
        let group_tracks = self.fetcher.fetch(group, range).await?;

        let total: usize = group_tracks.values().map(Vec::len).sum();
        info!(users = group_tracks.len(), plays = total, "Adding plays");

        let mut added = 0;
        for (user, tracks) in &group_tracks {
            info!(user = %user, plays = tracks.len(), "Processing user");

            for scrobble in tracks {
                let play = Play::from_scrobble(user, scrobble);
                self.store
                    .add_play(&play)
                    .await
                    .map_err(|source| ImportError::Storage {
                        user: user.clone(),
                        source,
                    })?;

                added += 1;
                if added % PROGRESS_INTERVAL == 0 {
                    info!("Adding plays [{}/{}]", added, total);
                }
            }

            info!(user = %user, "Adding plays [{}/{}]", added, total);
        }

        let summary = ImportSummary {
            users: group_tracks.len(),
            plays: added,
            requests: self.limiter.acquired() - requests_before,
        };
        info!(
            users = summary.users,
            plays = summary.plays,
            requests = summary.requests,
            "Import complete"
        );

        Ok(summary)
    }
}

/// Run `inb4 build` with resolved settings against Last.fm
pub async fn run_build(config: &ImportConfig, range: &DateRange) -> ImportResult<ImportSummary> {
    info!("Database: {}", config.db_path.display());
    info!("Cache directory: {}", config.cache_dir.display());

    let pool = inb4_common::db::init_database(&config.db_path).await?;
    let api: Arc<dyn ListeningHistoryApi> = Arc::new(LastFmClient::new(config.api_key.clone())?);
    let cache = ResponseCache::on_disk(&config.cache_dir);
    let limiter = Arc::new(RateLimiter::default());

    let summary = Importer::new(api, cache, limiter, pool.clone())
        .run(&config.group, range)
        .await;

    pool.close().await;
    summary
}
