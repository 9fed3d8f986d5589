use super::types::Comment;

/// Author selection narrowing the visible comments. `None` shows all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection(Option<String>);

impl FilterSelection {
    pub fn all() -> Self {
        Self(None)
    }

    /// Select an author. An empty login clears the selection.
    pub fn author(login: &str) -> Self {
        let login = login.trim();
        if login.is_empty() {
            Self(None)
        } else {
            Self(Some(login.to_string()))
        }
    }

    pub fn login(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn matches(&self, comment: &Comment) -> bool {
        match &self.0 {
            None => true,
            Some(login) => comment.author_login() == Some(login.as_str()),
        }
    }
}

/// Comments visible under `selection`, in their original order.
pub fn apply_filter<'a>(comments: &'a [Comment], selection: &FilterSelection) -> Vec<&'a Comment> {
    comments.iter().filter(|c| selection.matches(c)).collect()
}
