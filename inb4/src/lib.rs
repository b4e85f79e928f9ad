//! inb4 library interface
//!
//! Builds a local SQLite database of the Last.fm listening history of
//! every member of a group:
//! - [`services::GroupFetcher`] / [`services::PagedFetcher`] fetch and
//!   cache `user.getRecentTracks` pages under a [`rate_limiter::RateLimiter`]
//! - [`db::PlayStore`] stores each listen with find-or-create semantics

pub mod cache;
pub mod db;
pub mod error;
pub mod lastfm;
pub mod rate_limiter;
pub mod services;
pub mod types;

pub use crate::error::{FetchError, ImportError, ImportResult};
pub use crate::types::{EntityInfo, GroupTracks, Play, Scrobble};
