//! Error types for inb4
//!
//! Every error aborts the current run. Already cached pages and already
//! stored rows are kept, so running again after a fix resumes cheaply.

use crate::cache::CacheError;
use crate::lastfm::LastFmError;
use std::fmt;
use thiserror::Error;

/// Which request of a paginated fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRef {
    /// The initial request that reports the page count
    Count,
    Number(u32),
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRef::Count => write!(f, "page count"),
            PageRef::Number(n) => write!(f, "page {}", n),
        }
    }
}

/// Fetch layer errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Fetching tracks for user {user} failed at {page}: {source}")]
    Tracks {
        user: String,
        page: PageRef,
        #[source]
        source: LastFmError,
    },

    #[error("Fetching members of group {group} failed at page {page}: {source}")]
    Members {
        group: String,
        page: u32,
        #[source]
        source: LastFmError,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl FetchError {
    /// User whose fetch failed, if the failure was user-scoped
    pub fn user(&self) -> Option<&str> {
        match self {
            FetchError::Tracks { user, .. } => Some(user),
            _ => None,
        }
    }
}

/// Errors of a whole import run
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Storing play for user {user} failed: {source}")]
    Storage {
        user: String,
        #[source]
        source: inb4_common::Error,
    },

    #[error(transparent)]
    Setup(#[from] inb4_common::Error),

    #[error("Cannot create Last.fm client: {0}")]
    Client(#[from] LastFmError),
}

/// Result type for import runs
pub type ImportResult<T> = Result<T, ImportError>;
