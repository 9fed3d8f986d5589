use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::types::RawResponse;
use super::FetchError;

/// Issues a single GET. Implementations are stateless per call and must not
/// interpret the status code; that is the engine's job.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<RawResponse, FetchError>;
}

/// reqwest-backed executor used against the real API.
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    /// Build the executor. `timeout` bounds each individual request; without
    /// it a hung request keeps its query loading indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    #[instrument(skip(self, headers))]
    async fn get(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<RawResponse, FetchError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;
        debug!(status, body_bytes = body.len(), "received response");

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Serves canned responses keyed by URL; anything else is a 404.
/// Backs the `--mock` demo mode.
#[derive(Debug, Default)]
pub struct StaticExecutor {
    responses: HashMap<String, RawResponse>,
}

impl StaticExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a JSON body for `url`, optionally advertising a `next` page.
    pub fn with_page(mut self, url: &str, body: &str, next: Option<&str>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        if let Some(next) = next {
            headers.insert("link".to_string(), format!("<{next}>; rel=\"next\""));
        }
        self.responses.insert(
            url.to_string(),
            RawResponse {
                status: 200,
                headers,
                body: body.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl RequestExecutor for StaticExecutor {
    async fn get(
        &self,
        url: &str,
        _headers: &BTreeMap<String, String>,
    ) -> Result<RawResponse, FetchError> {
        Ok(self.responses.get(url).cloned().unwrap_or_else(|| RawResponse {
            status: 404,
            headers: BTreeMap::new(),
            body: r#"{"message":"Not Found"}"#.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_http_executor_sends_headers_and_captures_link() {
        let server = MockServer::start().await;
        let next = format!("{}/items?page=2", server.uri());
        Mock::given(method("GET"))
            .and(path("/items"))
            .and(header("authorization", "Bearer t0ken"))
            .and(header("user-agent", "issue-thread"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"id": 1}]))
                    .insert_header("Link", format!("<{next}>; rel=\"next\"").as_str()),
            )
            .mount(&server)
            .await;

        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer t0ken".to_string());
        headers.insert("User-Agent".to_string(), "issue-thread".to_string());

        let executor = HttpExecutor::new(None).unwrap();
        let response = executor
            .get(&format!("{}/items", server.uri()), &headers)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert!(response.headers["link"].contains("page=2"));
        assert!(response.body.contains("\"id\""));
    }

    #[tokio::test]
    async fn test_http_executor_reports_error_status_without_failing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let executor = HttpExecutor::new(Some(Duration::from_secs(5))).unwrap();
        let response = executor
            .get(&format!("{}/missing", server.uri()), &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_static_executor_unknown_url_is_not_found() {
        let executor = StaticExecutor::new().with_page("https://x/1", "{}", None);
        let known = executor.get("https://x/1", &BTreeMap::new()).await.unwrap();
        assert_eq!(known.status, 200);
        let unknown = executor.get("https://x/2", &BTreeMap::new()).await.unwrap();
        assert_eq!(unknown.status, 404);
    }
}
