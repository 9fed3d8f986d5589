mod config;
mod fetch;
mod query;
mod render;
mod thread;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use fetch::{HttpExecutor, RequestExecutor, StaticExecutor};
use query::QueryCache;
use thread::{request_headers, resolve_issue_url, ThreadError, ThreadViewModel};

const DEFAULT_ISSUE: &str = "facebook/react/issues/7901";
const MOCK_ISSUE_URL: &str = "https://api.github.com/repos/octo/demo/issues/1";
const MOCK_COMMENTS_URL: &str = "https://api.github.com/repos/octo/demo/issues/1/comments";
const MOCK_COMMENTS_PAGE_2: &str = "https://api.github.com/repos/octo/demo/issues/1/comments?page=2";

/// Issue Thread: renders a GitHub issue and its comments as a conversation,
/// optionally narrowed to the messages of one participant.
#[derive(Parser, Debug)]
#[command(name = "issue-thread", version, about)]
struct Cli {
    /// Issue to load: owner/repo/issues/N, a github.com issue URL, or an API URL
    ///
    /// Defaults to facebook/react/issues/7901 (or the demo issue with --mock).
    issue: Option<String>,

    /// Only show comments written by this login
    #[arg(short, long)]
    user: Option<String>,

    /// Optional output file path for a markdown rendering of the thread
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Serve a built-in demo thread instead of calling GitHub (no token needed)
    #[arg(long)]
    r#mock: bool,

    /// Read commands from stdin: open <issue>, user <login>, all, who, refetch, quit
    #[arg(short, long)]
    interactive: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load()?;

    let (executor, token): (Arc<dyn RequestExecutor>, String) = if cli.r#mock {
        info!("using mock issue thread for demo");
        (Arc::new(build_mock_executor()), "mock-token".to_string())
    } else {
        let token = config.github_token().ok_or(ThreadError::MissingToken)?;
        (Arc::new(HttpExecutor::new(config.timeout())?), token)
    };

    let cache = QueryCache::new(executor);
    let mut model = ThreadViewModel::new(cache, request_headers(&token, config.user_agent()));

    let default_issue = if cli.r#mock { MOCK_ISSUE_URL } else { DEFAULT_ISSUE };
    let input = cli.issue.as_deref().unwrap_or(default_issue);
    let url = resolve_issue_url(input, config.api_base())?;

    let _main_span = info_span!("issue_thread", issue = %url).entered();
    debug!(input = %input, "resolved issue reference");

    model.open_issue(&url);
    model.settle().await;

    if let Some(login) = cli.user.as_deref() {
        model.select_author(login);
    }

    if cli.interactive {
        run_interactive(&mut model, config.api_base()).await?;
    } else {
        let view = model.view();
        info!(messages = view.messages.len(), participants = view.participants.len(), "rendering thread");
        render::output(&view, cli.output.as_deref())?;
    }

    Ok(())
}

/// Line-driven session: each command updates the view model, then the thread
/// is drawn again. Filtering reuses fetched data; opening an issue fetches.
async fn run_interactive(
    model: &mut ThreadViewModel,
    api_base: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    render::output(&model.view(), None)?;
    eprintln!("commands: open <issue>, user <login>, all, who, refetch, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, arg) = line
            .split_once(' ')
            .map(|(command, arg)| (command, arg.trim()))
            .unwrap_or((line, ""));

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "open" => match resolve_issue_url(arg, api_base) {
                Ok(url) => {
                    model.open_issue(&url);
                    model.settle().await;
                }
                Err(err) => {
                    eprintln!("{err}");
                    continue;
                }
            },
            "user" => {
                model.select_author(arg);
                match model.filter().login() {
                    Some(login) => eprintln!("showing comments from {login}"),
                    None => eprintln!("showing all comments"),
                }
            }
            "all" => model.show_all(),
            "who" => {
                for user in model.participants() {
                    println!("{}  {}", user.login, user.avatar_url);
                }
                continue;
            }
            "refetch" => {
                model.refetch();
                model.settle().await;
            }
            other => {
                eprintln!("unknown command: {other}");
                continue;
            }
        }

        render::output(&model.view(), None)?;
    }

    Ok(())
}

/// Build an executor serving the embedded demo thread: one issue and three
/// comments split over two pages.
fn build_mock_executor() -> StaticExecutor {
    StaticExecutor::new()
        .with_page(MOCK_ISSUE_URL, include_str!("../tests/fixtures/issue.json"), None)
        .with_page(
            MOCK_COMMENTS_URL,
            include_str!("../tests/fixtures/comments_page1.json"),
            Some(MOCK_COMMENTS_PAGE_2),
        )
        .with_page(
            MOCK_COMMENTS_PAGE_2,
            include_str!("../tests/fixtures/comments_page2.json"),
            None,
        )
}
