use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Identity of one paginated query: the first page URL plus every request
/// header. Two configs are the same query iff both match exactly.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FetchConfig {
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

impl FetchConfig {
    pub fn new(url: impl Into<String>, headers: BTreeMap<String, String>) -> Self {
        Self {
            url: url.into(),
            headers,
        }
    }
}

// Keeps bearer tokens out of logs and panics.
impl fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .map(|(name, value)| {
                if name.eq_ignore_ascii_case("authorization") {
                    (name.as_str(), "<redacted>")
                } else {
                    (name.as_str(), value.as_str())
                }
            })
            .collect();
        f.debug_struct("FetchConfig")
            .field("url", &self.url)
            .field("headers", &headers)
            .finish()
    }
}

/// Raw outcome of one GET, as handed back by a request executor.
/// Header names are lowercase.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A decoded response body: a single JSON object or an ordered sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Scalar(Value),
    Sequence(Vec<Value>),
}

impl Body {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => Body::Sequence(items),
            other => Body::Scalar(other),
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Body::Scalar(_) => "object",
            Body::Sequence(_) => "sequence",
        }
    }
}

/// One successfully captured page. Immutable once built.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Body,
}

impl Page {
    pub fn link(&self) -> Option<&str> {
        self.headers.get("link").map(String::as_str)
    }
}

/// The merged value of every page of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult {
    pub body: Body,
    pub pages: usize,
}

impl AggregatedResult {
    /// Decode the merged body into a typed value. A sequence decodes as a
    /// JSON array, so `T` is usually a `Vec<_>` in that case.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.body {
            Body::Scalar(value) => T::deserialize(value),
            Body::Sequence(items) => T::deserialize(Value::Array(items.clone())),
        }
    }

    pub fn len(&self) -> usize {
        match &self.body {
            Body::Scalar(_) => 1,
            Body::Sequence(items) => items.len(),
        }
    }
}

/// Coarse classification of a failed query, as shown to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    TransportFailure,
    AggregationMismatch,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::TransportFailure => write!(f, "transport failure"),
            ErrorKind::AggregationMismatch => write!(f, "aggregation mismatch"),
        }
    }
}
