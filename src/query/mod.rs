//! Query coordination on top of the paginated fetch engine.
//!
//! A [`QueryCache`] is created once by the application root and handed to
//! every component that fetches. It keeps a weak index from [`FetchConfig`]
//! to the shared state of the running (or settled) query for that config, so
//! consumers asking for the same config join one page-fetch sequence instead
//! of starting another. Each consumer holds a [`Query`] handle; when the last
//! handle for a config goes away the query is released and any request still
//! in flight is abandoned.

pub mod types;

pub use types::QueryState;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::fetch::{fetch_all, AggregatedResult, FetchConfig, RequestExecutor};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct QueryCache {
    executor: Arc<dyn RequestExecutor>,
    entries: Mutex<HashMap<FetchConfig, Weak<QueryEntry>>>,
}

struct QueryEntry {
    state: watch::Sender<QueryState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for QueryEntry {
    fn drop(&mut self) {
        let task = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

impl QueryCache {
    pub fn new(executor: Arc<dyn RequestExecutor>) -> Arc<Self> {
        Arc::new(Self {
            executor,
            entries: Mutex::new(HashMap::new()),
        })
    }

    /// Join the live query for `config`, starting it if nobody holds one.
    fn subscribe(&self, config: &FetchConfig) -> ActiveQuery {
        let mut entries = lock(&self.entries);
        entries.retain(|_, entry| entry.strong_count() > 0);

        if let Some(entry) = entries.get(config).and_then(Weak::upgrade) {
            debug!(url = %config.url, "joining existing query");
            let state = entry.state.subscribe();
            return ActiveQuery { entry, state };
        }

        let (sender, state) = watch::channel(QueryState::Loading { page: 0 });
        let entry = Arc::new(QueryEntry {
            state: sender,
            task: Mutex::new(None),
        });
        entries.insert(config.clone(), Arc::downgrade(&entry));
        drop(entries);

        debug!(url = %config.url, live = self.live_queries(), "starting query");
        let task = tokio::spawn(run_query(
            self.executor.clone(),
            config.clone(),
            Arc::downgrade(&entry),
        ));
        *lock(&entry.task) = Some(task);

        ActiveQuery { entry, state }
    }

    /// Forget the indexed query for `config`; the next subscriber starts a
    /// fresh one. Current holders keep the state they already have.
    pub fn invalidate(&self, config: &FetchConfig) {
        lock(&self.entries).remove(config);
    }

    /// Number of configs with at least one live consumer.
    pub fn live_queries(&self) -> usize {
        lock(&self.entries)
            .values()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }
}

async fn run_query(
    executor: Arc<dyn RequestExecutor>,
    config: FetchConfig,
    entry: Weak<QueryEntry>,
) {
    let progress = entry.clone();
    let result = fetch_all(executor.as_ref(), &config, move |page| {
        publish(&progress, QueryState::Loading { page });
    })
    .await;

    let state = match result {
        Ok(result) => {
            info!(url = %config.url, pages = result.pages, items = result.len(), "query settled");
            QueryState::Success(Arc::new(result))
        }
        Err(err) => {
            warn!(url = %config.url, kind = %err.kind(), error = %err, "query failed");
            QueryState::Error(Arc::new(err))
        }
    };
    publish(&entry, state);
}

// Results for a released query go nowhere.
fn publish(entry: &Weak<QueryEntry>, state: QueryState) {
    match entry.upgrade() {
        Some(entry) => {
            entry.state.send_replace(state);
        }
        None => debug!("discarding update for released query"),
    }
}

struct ActiveQuery {
    // Keeps the shared entry alive for as long as this consumer uses it.
    #[allow(dead_code)]
    entry: Arc<QueryEntry>,
    state: watch::Receiver<QueryState>,
}

/// One consumer's view of a query whose config may change over time.
pub struct Query {
    cache: Arc<QueryCache>,
    config: Option<FetchConfig>,
    active: Option<ActiveQuery>,
}

impl Query {
    pub fn new(cache: Arc<QueryCache>) -> Self {
        Self {
            cache,
            config: None,
            active: None,
        }
    }

    /// Point the query at `config`. Called repeatedly with the current
    /// config; a different config drops the old state and starts over from
    /// page 0, while the same config is a no-op. Nothing runs while
    /// `enabled` is false, but disabling never discards settled state.
    pub fn sync(&mut self, config: Option<FetchConfig>, enabled: bool) -> QueryState {
        if self.config != config {
            if self.active.take().is_some() {
                debug!("query config changed, releasing previous state");
            }
            self.config = config;
        }

        if enabled && self.active.is_none() {
            if let Some(config) = &self.config {
                self.active = Some(self.cache.subscribe(config));
            }
        }

        self.state()
    }

    /// Sync a query whose config is derived from another query's result.
    /// It stays disabled, with no config, until `predecessor` has succeeded
    /// and `derive` yields a config.
    pub fn sync_after<F>(&mut self, predecessor: &QueryState, derive: F) -> QueryState
    where
        F: FnOnce(&AggregatedResult) -> Option<FetchConfig>,
    {
        let config = predecessor.data().and_then(|data| derive(data));
        let enabled = config.is_some();
        self.sync(config, enabled)
    }

    /// Drop the cached result for the current config and run it again.
    pub fn refetch(&mut self) -> QueryState {
        if let (Some(config), Some(_)) = (&self.config, &self.active) {
            info!(url = %config.url, "refetching query");
            self.cache.invalidate(config);
            self.active = Some(self.cache.subscribe(config));
        }
        self.state()
    }

    pub fn state(&self) -> QueryState {
        self.active
            .as_ref()
            .map(|active| active.state.borrow().clone())
            .unwrap_or(QueryState::Idle)
    }

    /// Wait until the current query succeeds or fails. Returns `Idle` at once
    /// when nothing is running.
    pub async fn settled(&mut self) -> QueryState {
        let Some(active) = self.active.as_mut() else {
            return QueryState::Idle;
        };
        let settled = active
            .state
            .wait_for(QueryState::is_settled)
            .await
            .map(|state| QueryState::clone(&state));
        settled.unwrap_or_else(|_| active.state.borrow().clone())
    }
}
