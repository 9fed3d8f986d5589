use std::sync::Arc;

use crate::fetch::{AggregatedResult, ErrorKind, FetchError};

/// Coarse status, the shape exposed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of a query as seen by every consumer of its config.
#[derive(Debug, Clone)]
pub enum QueryState {
    /// No config, or disabled before ever running.
    Idle,
    /// `page` is the zero-based index of the page being requested.
    Loading { page: usize },
    Success(Arc<AggregatedResult>),
    Error(Arc<FetchError>),
}

impl QueryState {
    pub fn status(&self) -> QueryStatus {
        match self {
            QueryState::Idle => QueryStatus::Idle,
            QueryState::Loading { .. } => QueryStatus::Loading,
            QueryState::Success(_) => QueryStatus::Success,
            QueryState::Error(_) => QueryStatus::Error,
        }
    }

    pub fn data(&self) -> Option<&Arc<AggregatedResult>> {
        match self {
            QueryState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Arc<FetchError>> {
        match self {
            QueryState::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(|err| err.kind())
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, QueryState::Success(_) | QueryState::Error(_))
    }
}
