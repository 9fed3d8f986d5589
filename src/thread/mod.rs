pub mod filter;
pub mod participants;
pub mod types;

pub use filter::{apply_filter, FilterSelection};
pub use participants::derive_participants;
pub use types::{Bubble, Comment, Issue, Message, Region, ThreadView, User};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::fetch::{ErrorKind, FetchConfig};
use crate::query::{Query, QueryCache, QueryState};

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("Invalid issue reference: {0}")]
    InvalidIssue(String),

    #[error("GitHub token not found in config or environment")]
    MissingToken,
}

/// Turn user input into the API URL of an issue.
///
/// Accepted forms:
/// - `owner/repo/issues/42`, resolved against `api_base`
/// - `https://github.com/owner/repo/issues/42`, translated to the API URL
/// - any other `http(s)` URL, used verbatim
pub fn resolve_issue_url(input: &str, api_base: &str) -> Result<String, ThreadError> {
    let input = input.trim();
    let api_base = api_base.trim_end_matches('/');
    let invalid = || ThreadError::InvalidIssue(input.to_string());

    if input.starts_with("http://") || input.starts_with("https://") {
        let parsed = reqwest::Url::parse(input).map_err(|_| invalid())?;
        if parsed.host_str() != Some("github.com") {
            return Ok(input.to_string());
        }
        let segments: Vec<_> = parsed
            .path_segments()
            .ok_or_else(invalid)?
            .filter(|segment| !segment.is_empty())
            .collect();
        let path = issue_path(&segments).ok_or_else(invalid)?;
        return Ok(format!("{api_base}/repos/{path}"));
    }

    let segments: Vec<_> = input.split('/').filter(|s| !s.is_empty()).collect();
    let path = issue_path(&segments).ok_or_else(invalid)?;
    Ok(format!("{api_base}/repos/{path}"))
}

fn issue_path(segments: &[&str]) -> Option<String> {
    match segments {
        [owner, repo, "issues", number] if number.parse::<u64>().is_ok() => {
            Some(format!("{owner}/{repo}/issues/{number}"))
        }
        _ => None,
    }
}

/// Headers attached to every request. They are part of each query's
/// identity, so a different token means a different cache entry.
pub fn request_headers(token: &str, user_agent: &str) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("Accept".to_string(), "application/vnd.github+json".to_string());
    headers.insert("Authorization".to_string(), format!("Bearer {token}"));
    headers.insert("User-Agent".to_string(), user_agent.to_string());
    headers
}

/// State behind one rendered issue thread: the issue query, the dependent
/// comments query and the author filter.
pub struct ThreadViewModel {
    headers: BTreeMap<String, String>,
    issue_url: Option<String>,
    issue: Query,
    comments: Query,
    filter: FilterSelection,
}

impl ThreadViewModel {
    pub fn new(cache: Arc<QueryCache>, headers: BTreeMap<String, String>) -> Self {
        Self {
            headers,
            issue_url: None,
            issue: Query::new(cache.clone()),
            comments: Query::new(cache),
            filter: FilterSelection::all(),
        }
    }

    /// Switch to another issue. The filter is cleared and both queries drop
    /// the previous issue's state before anything new is fetched.
    #[instrument(skip(self))]
    pub fn open_issue(&mut self, url: &str) {
        if self.issue_url.as_deref() == Some(url) {
            return;
        }
        info!("opening issue");
        self.filter = FilterSelection::all();
        self.issue_url = Some(url.to_string());
        self.issue
            .sync(Some(FetchConfig::new(url, self.headers.clone())), true);
        self.sync_comments();
    }

    /// Narrow the comments to one author; an empty login shows everyone.
    /// Purely local, never triggers a request.
    pub fn select_author(&mut self, login: &str) {
        self.filter = FilterSelection::author(login);
        debug!(filter = ?self.filter.login(), "filter changed");
    }

    pub fn show_all(&mut self) {
        self.filter = FilterSelection::all();
    }

    pub fn filter(&self) -> &FilterSelection {
        &self.filter
    }

    /// Re-derive the comments query from the issue query's current state.
    /// The comments query only runs once the issue has loaded and named its
    /// comments collection.
    pub fn sync_comments(&mut self) -> QueryState {
        let headers = self.headers.clone();
        let issue_state = self.issue.state();
        self.comments.sync_after(&issue_state, move |data| {
            let issue: Issue = data.decode().ok()?;
            Some(FetchConfig::new(issue.comments_url, headers))
        })
    }

    /// Wait for the issue, start the comments, and wait for those too.
    pub async fn settle(&mut self) {
        let issue = self.issue.settled().await;
        self.sync_comments();
        let comments = self.comments.settled().await;
        debug!(issue = ?issue.status(), comments = ?comments.status(), "thread settled");
    }

    /// Fetch the active issue and its comments again from the first page.
    pub fn refetch(&mut self) {
        self.issue.refetch();
        self.sync_comments();
    }

    pub fn issue(&self) -> Region<Issue> {
        region(&self.issue.state())
    }

    pub fn comments(&self) -> Region<Vec<Comment>> {
        region(&self.comments.state())
    }

    pub fn participants(&self) -> Vec<User> {
        let issue = self.issue();
        let comments = self.comments();
        derive_participants(issue.ready(), comments.ready().map(Vec::as_slice))
    }

    /// Snapshot of everything the thread shows right now.
    pub fn view(&self) -> ThreadView {
        let issue = self.issue();
        let comments_state = self.comments.state();
        let comments = region::<Vec<Comment>>(&comments_state);
        let comments_page = match comments_state {
            QueryState::Loading { page } => Some(page),
            _ => None,
        };
        let participants =
            derive_participants(issue.ready(), comments.ready().map(Vec::as_slice));

        let mut messages = Vec::new();
        if let Some(root) = issue.ready() {
            let author = root.user.as_ref();
            messages.push(Message {
                id: root.id,
                author: root.user.clone(),
                created_at: root.created_at.clone(),
                body: root.body.clone().unwrap_or_default(),
                bubble: Bubble::Solid,
            });
            if let Some(all) = comments.ready() {
                messages.extend(apply_filter(all, &self.filter).into_iter().map(|c| Message {
                    id: c.id,
                    author: c.user.clone(),
                    created_at: c.created_at.clone(),
                    body: c.body.clone().unwrap_or_default(),
                    bubble: bubble_for(c.user.as_ref(), author),
                }));
            }
        }

        let comments = match comments {
            Region::Idle => Region::Idle,
            Region::Loading => Region::Loading,
            Region::Ready(all) => Region::Ready(all.len()),
            Region::NotFound => Region::NotFound,
            Region::Failed(reason) => Region::Failed(reason),
        };

        ThreadView {
            issue,
            messages,
            comments,
            comments_page,
            participants,
            filter: self.filter.login().map(str::to_string),
        }
    }
}

/// Solid for the issue author, outlined for everyone else. Decided by login.
pub fn bubble_for(author: Option<&User>, issue_author: Option<&User>) -> Bubble {
    match (author, issue_author) {
        (Some(a), Some(b)) if a.login == b.login => Bubble::Solid,
        _ => Bubble::Outlined,
    }
}

fn region<T: DeserializeOwned>(state: &QueryState) -> Region<T> {
    match state {
        QueryState::Idle => Region::Idle,
        QueryState::Loading { .. } => Region::Loading,
        QueryState::Success(data) => match data.decode() {
            Ok(value) => Region::Ready(value),
            Err(err) => Region::Failed(format!("Unexpected response shape: {err}")),
        },
        QueryState::Error(_) if state.error_kind() == Some(ErrorKind::NotFound) => Region::NotFound,
        QueryState::Error(err) => Region::Failed(err.to_string()),
    }
}
