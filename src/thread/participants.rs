use std::collections::HashSet;

use super::types::{Comment, Issue, User};

/// Distinct authors of the thread, issue author first, then comment authors
/// in first-seen order. A login already seen is skipped, never overwritten.
/// Messages without an author contribute nothing.
pub fn derive_participants(issue: Option<&Issue>, comments: Option<&[Comment]>) -> Vec<User> {
    let Some(issue) = issue else {
        return Vec::new();
    };

    let authors = issue
        .user
        .iter()
        .chain(comments.unwrap_or_default().iter().filter_map(|c| c.user.as_ref()));

    let mut seen = HashSet::new();
    let mut participants = Vec::new();
    for user in authors {
        if seen.insert(user.login.as_str()) {
            participants.push(user.clone());
        }
    }
    participants
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::thread::types::IssueState;

    pub fn user(login: &str) -> User {
        User {
            login: login.to_string(),
            avatar_url: format!("https://avatars.example/{login}"),
        }
    }

    pub fn issue_by(login: &str) -> Issue {
        Issue {
            id: 1,
            created_at: "2016-10-06T09:00:00Z".to_string(),
            user: Some(user(login)),
            number: 7901,
            title: "Flaky render".to_string(),
            body: Some("It breaks sometimes".to_string()),
            state: IssueState::Open,
            comments_url: "https://x/comments".to_string(),
        }
    }

    pub fn comment_by(id: u64, login: &str) -> Comment {
        Comment {
            id,
            created_at: "2016-10-07T09:00:00Z".to_string(),
            user: Some(user(login)),
            body: Some(format!("comment {id} by {login}")),
        }
    }

    fn logins(users: &[User]) -> Vec<&str> {
        users.iter().map(|u| u.login.as_str()).collect()
    }

    #[test]
    fn test_first_seen_order_without_duplicates() {
        let issue = issue_by("a");
        let comments: Vec<Comment> = ["b", "a", "c", "b"]
            .iter()
            .enumerate()
            .map(|(i, login)| comment_by(i as u64, login))
            .collect();
        let users = derive_participants(Some(&issue), Some(&comments));
        assert_eq!(logins(&users), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_later_duplicate_does_not_overwrite() {
        let issue = issue_by("a");
        let mut comment = comment_by(1, "a");
        comment.user.as_mut().unwrap().avatar_url = "https://other".to_string();
        let users = derive_participants(Some(&issue), Some(&[comment]));
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].avatar_url, "https://avatars.example/a");
    }

    #[test]
    fn test_comments_not_yet_loaded() {
        let issue = issue_by("a");
        assert_eq!(logins(&derive_participants(Some(&issue), None)), vec!["a"]);
        assert_eq!(logins(&derive_participants(Some(&issue), Some(&[]))), vec!["a"]);
    }

    #[test]
    fn test_no_issue_means_no_participants() {
        let comments = vec![comment_by(1, "b")];
        assert!(derive_participants(None, Some(&comments)).is_empty());
    }

    #[test]
    fn test_ghost_authors_are_skipped() {
        let mut issue = issue_by("a");
        issue.user = None;
        let mut ghost = comment_by(1, "x");
        ghost.user = None;
        let comments = vec![ghost, comment_by(2, "b")];
        assert_eq!(logins(&derive_participants(Some(&issue), Some(&comments))), vec!["b"]);
    }
}
