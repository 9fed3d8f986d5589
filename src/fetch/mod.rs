pub mod engine;
pub mod executor;
pub mod link;
pub mod types;

pub use engine::fetch_all;
pub use executor::{HttpExecutor, RequestExecutor, StaticExecutor};
pub use types::{AggregatedResult, ErrorKind, FetchConfig};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Resource not found: {url}")]
    NotFound { url: String },

    #[error("Request to {url} failed with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Malformed Link header: {0}")]
    MalformedLink(String),

    #[error("Page {page} returned a {found} body while earlier pages returned a {expected}")]
    ShapeMismatch {
        page: usize,
        expected: &'static str,
        found: &'static str,
    },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::NotFound { .. } => ErrorKind::NotFound,
            FetchError::Status { .. } | FetchError::Transport(_) | FetchError::Decode(_) => {
                ErrorKind::TransportFailure
            }
            FetchError::MalformedLink(_) | FetchError::ShapeMismatch { .. } => {
                ErrorKind::AggregationMismatch
            }
        }
    }
}

#[cfg(test)]
pub mod test_support {
    //! Scripted executor shared by the engine, query and thread tests.

    use std::collections::{BTreeMap, HashMap};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::Notify;

    use super::types::RawResponse;
    use super::{FetchError, RequestExecutor};

    #[derive(Default)]
    pub struct ScriptedExecutor {
        responses: Mutex<HashMap<String, RawResponse>>,
        gates: Mutex<HashMap<String, Arc<Notify>>>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, url: &str, status: u16, body: Value, next: Option<&str>) {
            let mut headers = BTreeMap::new();
            if let Some(next) = next {
                headers.insert("link".to_string(), format!("<{next}>; rel=\"next\""));
            }
            self.respond_raw(
                url,
                RawResponse {
                    status,
                    headers,
                    body: body.to_string(),
                },
            );
        }

        pub fn respond_raw(&self, url: &str, response: RawResponse) {
            self.responses.lock().unwrap().insert(url.to_string(), response);
        }

        /// Hold the response for `url` until the returned gate is notified.
        pub fn gate(&self, url: &str) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.gates.lock().unwrap().insert(url.to_string(), gate.clone());
            gate
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        pub fn request_count(&self, url: &str) -> usize {
            self.requests.lock().unwrap().iter().filter(|u| *u == url).count()
        }
    }

    #[async_trait]
    impl RequestExecutor for ScriptedExecutor {
        async fn get(
            &self,
            url: &str,
            _headers: &BTreeMap<String, String>,
        ) -> Result<RawResponse, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            let gate = self.gates.lock().unwrap().get(url).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            let response = self.responses.lock().unwrap().get(url).cloned();
            Ok(response.unwrap_or(RawResponse {
                status: 404,
                headers: BTreeMap::new(),
                body: "{\"message\":\"Not Found\"}".to_string(),
            }))
        }
    }

    /// Wait until `url` has been requested at least `count` times.
    pub async fn wait_for_request(executor: &ScriptedExecutor, url: &str, count: usize) {
        for _ in 0..1000 {
            if executor.request_count(url) >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("{url} was never requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let not_found = FetchError::NotFound { url: "u".into() };
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        let status = FetchError::Status { url: "u".into(), status: 500 };
        assert_eq!(status.kind(), ErrorKind::TransportFailure);
        let link = FetchError::MalformedLink("x".into());
        assert_eq!(link.kind(), ErrorKind::AggregationMismatch);
    }
}
