//! Fetch and import services
//!
//! - [`PagedFetcher`]: one user's pages, cached and rate limited
//! - [`GroupFetcher`]: every member of a group, one user at a time
//! - [`Importer`]: group fetch followed by play storage

pub mod group_fetcher;
pub mod importer;
pub mod paged_fetcher;

pub use group_fetcher::{GroupFetcher, GROUP_TRACKS_PREFIX, USER_TRACKS_PREFIX};
pub use importer::{run_build, ImportSummary, Importer};
pub use paged_fetcher::{track_page_key, PagedFetcher, TRACK_PAGE_PREFIX};
