use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::thread::types::{Bubble, IssueState, Message, Region, ThreadView};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to write thread file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Output the thread to terminal (default) or to a markdown file.
#[instrument(skip(view), fields(messages = view.messages.len()))]
pub fn output(view: &ThreadView, output_path: Option<&Path>) -> Result<(), RenderError> {
    match output_path {
        None => {
            debug!("writing thread to terminal");
            print_terminal_thread(view);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing thread to file");
            std::fs::write(path, render_markdown(view))?;
            Ok(())
        }
    }
}

/// Text shown in place of the issue when it has nothing to display.
pub fn issue_status(issue: &Region<crate::thread::Issue>) -> Option<String> {
    match issue {
        Region::Idle => Some("No issue selected".to_string()),
        Region::Loading => Some("Loading issue...".to_string()),
        Region::NotFound => Some("Issue not found".to_string()),
        Region::Failed(reason) => Some(reason.clone()),
        Region::Ready(_) => None,
    }
}

/// Text shown under the messages describing the comments region.
pub fn comments_status(view: &ThreadView) -> Option<String> {
    let text = match view.comments {
        Region::Loading => match view.comments_page {
            Some(page) if page > 0 => format!("Loading comments (page {})...", page + 1),
            _ => "Loading comments...".to_string(),
        },
        Region::Idle => "Loading comments...".to_string(),
        Region::NotFound | Region::Failed(_) => "Error loading comments".to_string(),
        Region::Ready(0) => "No comments available".to_string(),
        Region::Ready(_) if view.messages.len() > 1 => return None,
        // Comments exist but the filter hides all of them.
        Region::Ready(_) => match &view.filter {
            Some(login) => format!("No comments from {login}"),
            None => "No comments available".to_string(),
        },
    };
    Some(text)
}

fn print_terminal_thread(view: &ThreadView) {
    println!();
    let issue = match (&view.issue, issue_status(&view.issue)) {
        (Region::Ready(issue), _) => issue,
        (_, status) => {
            println!("{}", status.unwrap_or_default().dimmed());
            println!();
            return;
        }
    };

    let marker = match issue.state {
        IssueState::Open => "●".green(),
        IssueState::Closed => "●".red(),
    };
    println!("{} {} {}", marker, issue.title.bold(), format!("#{}", issue.number).cyan());
    let author = issue.user.as_ref().map(|u| u.login.as_str()).unwrap_or("Unknown user");
    println!("{}", author.italic());
    println!();

    let logins: Vec<&str> = view.participants.iter().map(|u| u.login.as_str()).collect();
    println!("Participants: {}", logins.join(", "));
    match &view.filter {
        Some(login) => println!("Filter: {}", login.yellow()),
        None => println!("Filter: all comments"),
    }
    println!();

    for message in &view.messages {
        print_message(message);
    }

    if let Some(status) = comments_status(view) {
        println!("{}", status.as_str().dimmed());
        println!();
    }
}

fn print_message(message: &Message) {
    let login = match message.bubble {
        Bubble::Solid => message.author_login().blue().bold(),
        Bubble::Outlined => message.author_login().normal(),
    };
    println!("{}  {}", login, message.created_at.dimmed());
    for line in message.body.lines() {
        match message.bubble {
            Bubble::Solid => println!("  ┃ {}", line),
            Bubble::Outlined => println!("  │ {}", line),
        }
    }
    println!();
}

/// Markdown rendering of the thread, same structure as the terminal output.
pub fn render_markdown(view: &ThreadView) -> String {
    let mut md = String::new();
    let issue = match (&view.issue, issue_status(&view.issue)) {
        (Region::Ready(issue), _) => issue,
        (_, status) => {
            md.push_str(&format!("_{}_\n", status.unwrap_or_default()));
            return md;
        }
    };

    md.push_str(&format!("# {} #{} ({})\n\n", issue.title, issue.number, issue.state));
    let author = issue.user.as_ref().map(|u| u.login.as_str()).unwrap_or("Unknown user");
    md.push_str(&format!("*{}*\n\n", author));

    let logins: Vec<String> = view
        .participants
        .iter()
        .map(|u| format!("[`{}`]({})", u.login, u.avatar_url))
        .collect();
    md.push_str(&format!("**Participants:** {}\n\n", logins.join(", ")));
    if let Some(login) = &view.filter {
        md.push_str(&format!("**Filter:** `{}`\n\n", login));
    }

    for message in &view.messages {
        let login = match message.bubble {
            Bubble::Solid => format!("**{}**", message.author_login()),
            Bubble::Outlined => message.author_login().to_string(),
        };
        md.push_str(&format!("### {} · {}\n\n", login, message.created_at));
        for line in message.body.lines() {
            md.push_str(&format!("> {}\n", line));
        }
        md.push('\n');
    }

    if let Some(status) = comments_status(view) {
        md.push_str(&format!("_{}_\n", status));
    }
    md
}
