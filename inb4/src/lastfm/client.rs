//! Last.fm API client
//!
//! Thin transport over the `2.0` JSON API. Throttling and caching are the
//! caller's job (see [`crate::services`]): every method here performs
//! exactly one HTTP request.

use super::models::{ApiErrorBody, GroupMembersPage, RawResponse, RecentTracksPage};
use super::ListeningHistoryApi;
use async_trait::async_trait;
use inb4_common::DateRange;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

pub const LASTFM_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";
const USER_AGENT: &str = concat!("inb4/", env!("CARGO_PKG_VERSION"));
/// Largest page size `user.getRecentTracks` accepts
const RECENT_TRACKS_LIMIT: u32 = 200;

/// Last.fm client errors
#[derive(Debug, Error)]
pub enum LastFmError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Last.fm API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Last.fm API client
pub struct LastFmClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl LastFmClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, LastFmError> {
        Self::with_base_url(api_key, LASTFM_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, LastFmError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, LastFmError> {
        tracing::debug!(method, ?params, "Querying Last.fm API");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("method", method),
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
            ])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_body(status.as_u16(), &body)
    }
}

/// Decode a response body, surfacing Last.fm error envelopes
///
/// Last.fm reports some failures with HTTP 200 and an `error` field, and
/// others with an error status and the same envelope.
fn parse_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, LastFmError> {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if !(200..300).contains(&status) => {
            return Err(LastFmError::HttpStatus {
                status,
                body: body.to_string(),
            })
        }
        Err(e) => return Err(LastFmError::Parse(e)),
    };

    if value.get("error").is_some() {
        let envelope: ApiErrorBody = serde_json::from_value(value)?;
        return Err(LastFmError::Api {
            code: envelope.error,
            message: envelope.message,
        });
    }

    if !(200..300).contains(&status) {
        return Err(LastFmError::HttpStatus {
            status,
            body: body.to_string(),
        });
    }

    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl ListeningHistoryApi for LastFmClient {
    async fn group_members(&self, group: &str, page: u32) -> Result<GroupMembersPage, LastFmError> {
        self.request(
            "group.getmembers",
            &[("group", group.to_string()), ("page", page.to_string())],
        )
        .await
    }

    async fn recent_tracks(
        &self,
        user: &str,
        range: &DateRange,
        page: Option<u32>,
    ) -> Result<RawResponse<RecentTracksPage>, LastFmError> {
        let mut params = vec![
            ("user", user.to_string()),
            ("limit", RECENT_TRACKS_LIMIT.to_string()),
            ("from", range.from_ts().to_string()),
            ("to", range.to_ts().to_string()),
        ];
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }

        let body: serde_json::Value = self.request("user.getrecenttracks", &params).await?;
        let response = RawResponse::<RecentTracksPage>::from_body(body)?;

        tracing::debug!(
            user = %user,
            tracks = response.data.recenttracks.track.len(),
            total_pages = response.data.total_pages(),
            "Retrieved recent tracks page from Last.fm"
        );

        Ok(response)
    }
}
