use serde::Deserialize;

/// A GitHub account as embedded in issues and comments.
/// Also serves as a thread participant; `login` is the identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl std::fmt::Display for IssueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueState::Open => write!(f, "open"),
            IssueState::Closed => write!(f, "closed"),
        }
    }
}

/// Issue payload from `GET /repos/{owner}/{repo}/issues/{number}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub created_at: String,
    pub user: Option<User>,
    pub number: u64,
    pub title: String,
    /// GitHub sends `null` for an empty description.
    #[serde(default)]
    pub body: Option<String>,
    pub state: IssueState,
    pub comments_url: String,
}

/// One entry of the issue's comments collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub created_at: String,
    pub user: Option<User>,
    #[serde(default)]
    pub body: Option<String>,
}

impl Comment {
    pub fn author_login(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.login.as_str())
    }
}

/// How a message is drawn: the issue author's messages are solid, everyone
/// else's outlined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bubble {
    Solid,
    Outlined,
}

/// One entry of the rendered conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub author: Option<User>,
    pub created_at: String,
    pub body: String,
    pub bubble: Bubble,
}

impl Message {
    pub fn author_login(&self) -> &str {
        self.author
            .as_ref()
            .map(|user| user.login.as_str())
            .unwrap_or("Unknown user")
    }
}

/// The display state of one independently loading region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region<T> {
    Idle,
    Loading,
    Ready(T),
    NotFound,
    Failed(String),
}

impl<T> Region<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Region::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// Everything needed to draw one issue thread.
#[derive(Debug, Clone)]
pub struct ThreadView {
    pub issue: Region<Issue>,
    /// The issue body first, then the visible comments.
    pub messages: Vec<Message>,
    pub comments: Region<usize>,
    /// Zero-based page being requested while the comments are loading.
    pub comments_page: Option<usize>,
    pub participants: Vec<User>,
    pub filter: Option<String>,
}
