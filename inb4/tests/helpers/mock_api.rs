//! Scripted Last.fm stand-in
//!
//! Serves fixed member lists and track pages, records every call, and can
//! delay or fail individual pages. Page 0 addresses the initial
//! page-count request.

use async_trait::async_trait;
use inb4::lastfm::{
    GroupMembersPage, LastFmError, ListeningHistoryApi, RawResponse, RawTrack, RecentTracksPage,
};
use inb4_common::DateRange;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// One recorded API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Members { group: String, page: u32 },
    Tracks { user: String, page: Option<u32> },
}

#[derive(Default)]
pub struct MockApi {
    /// group → member pages
    groups: HashMap<String, Vec<Vec<String>>>,
    /// user → track pages
    users: HashMap<String, Vec<Vec<RawTrack>>>,
    delays: HashMap<(String, u32), Duration>,
    failing: Mutex<HashSet<(String, u32)>>,
    calls: Mutex<Vec<ApiCall>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group whose members fit on one page
    pub fn with_group(self, group: &str, members: &[&str]) -> Self {
        self.with_group_pages(group, &[members])
    }

    pub fn with_group_pages(mut self, group: &str, pages: &[&[&str]]) -> Self {
        let pages = pages
            .iter()
            .map(|page| page.iter().map(|name| name.to_string()).collect())
            .collect();
        self.groups.insert(group.to_string(), pages);
        self
    }

    /// User with the given track pages; an empty list means no listens
    pub fn with_user(mut self, user: &str, pages: Vec<Vec<RawTrack>>) -> Self {
        self.users.insert(user.to_string(), pages);
        self
    }

    pub fn with_delay(mut self, user: &str, page: u32, delay: Duration) -> Self {
        self.delays.insert((user.to_string(), page), delay);
        self
    }

    pub fn failing(self, user: &str, page: u32) -> Self {
        self.fail(user, page);
        self
    }

    pub fn fail(&self, user: &str, page: u32) {
        self.failing.lock().unwrap().insert((user.to_string(), page));
    }

    pub fn heal(&self, user: &str, page: u32) {
        self.failing.lock().unwrap().remove(&(user.to_string(), page));
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Numbered page requests made for `user`
    pub fn page_calls(&self, user: &str) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::Tracks {
                    user: called,
                    page: Some(page),
                } if called == user => Some(page),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_failure(&self, user: &str, page: u32) -> Result<(), LastFmError> {
        if self.failing.lock().unwrap().contains(&(user.to_string(), page)) {
            return Err(LastFmError::Api {
                code: 8,
                message: format!("Operation failed for {} page {}", user, page),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ListeningHistoryApi for MockApi {
    async fn group_members(&self, group: &str, page: u32) -> Result<GroupMembersPage, LastFmError> {
        self.record(ApiCall::Members {
            group: group.to_string(),
            page,
        });

        let pages = self.groups.get(group).ok_or_else(|| LastFmError::Api {
            code: 6,
            message: "Group not found".to_string(),
        })?;

        let index = page.saturating_sub(1) as usize;
        let names: Vec<&str> = pages
            .get(index)
            .map(|names| names.iter().map(String::as_str).collect())
            .unwrap_or_default();

        Ok(GroupMembersPage::new(&names, page, pages.len() as u32))
    }

    async fn recent_tracks(
        &self,
        user: &str,
        _range: &DateRange,
        page: Option<u32>,
    ) -> Result<RawResponse<RecentTracksPage>, LastFmError> {
        self.record(ApiCall::Tracks {
            user: user.to_string(),
            page,
        });

        let number = page.unwrap_or(0);
        if let Some(delay) = self.delays.get(&(user.to_string(), number)) {
            tokio::time::sleep(*delay).await;
        }
        self.check_failure(user, number)?;

        let pages = self.users.get(user).cloned().unwrap_or_default();
        if pages.is_empty() {
            return Ok(RawResponse::from_data(RecentTracksPage::empty())?);
        }

        let index = page.unwrap_or(1).saturating_sub(1) as usize;
        let tracks = pages.get(index).cloned().unwrap_or_default();

        let mut response =
            RawResponse::from_data(RecentTracksPage::new(tracks, page.unwrap_or(1), pages.len() as u32))?;
        // Fields Last.fm sends that the models don't decode
        response.body["recenttracks"]["@attr"]["user"] = serde_json::Value::from(user);
        Ok(response)
    }
}
