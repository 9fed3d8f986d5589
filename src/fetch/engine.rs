use tracing::{debug, instrument};

use super::executor::RequestExecutor;
use super::link::next_link;
use super::types::{AggregatedResult, Body, FetchConfig, Page};
use super::FetchError;

/// Fetch every page reachable from `config.url` by following `next` links,
/// then merge them into one result.
///
/// Pages are requested strictly one after another since the next URL is only
/// known once the previous response is in. `on_page` is called with the
/// zero-based index of each page just before it is requested.
///
/// Any failure discards the pages fetched so far.
#[instrument(skip(executor, on_page), fields(url = %config.url))]
pub async fn fetch_all<F>(
    executor: &dyn RequestExecutor,
    config: &FetchConfig,
    mut on_page: F,
) -> Result<AggregatedResult, FetchError>
where
    F: FnMut(usize) + Send,
{
    let mut pages: Vec<Page> = Vec::new();
    let mut url = config.url.clone();

    loop {
        let index = pages.len();
        on_page(index);
        debug!(page = index, url = %url, "requesting page");

        let response = executor.get(&url, &config.headers).await?;
        if !response.is_success() {
            if response.status == 404 && index == 0 {
                return Err(FetchError::NotFound { url });
            }
            return Err(FetchError::Status {
                url,
                status: response.status,
            });
        }

        let body = Body::from_value(serde_json::from_str(&response.body)?);
        let page = Page {
            status: response.status,
            headers: response.headers,
            body,
        };

        // Only sequences paginate; an object ends the query even with a link.
        let next = match (&page.body, page.link()) {
            (Body::Sequence(_), Some(link)) => next_link(link)?,
            _ => None,
        };
        debug!(page = index, status = page.status, shape = page.body.shape(), "page received");
        pages.push(page);

        match next {
            Some(next) => url = next,
            None => break,
        }
    }

    debug!(pages = pages.len(), "pagination complete");
    aggregate(pages)
}

/// Merge captured pages in fetch order.
///
/// A lone page is returned as-is. Otherwise every page must be a sequence
/// and the result is their concatenation, without deduplication.
pub fn aggregate(pages: Vec<Page>) -> Result<AggregatedResult, FetchError> {
    let count = pages.len();
    let mut pages = pages.into_iter();
    let Some(first) = pages.next() else {
        return Ok(AggregatedResult {
            body: Body::Sequence(Vec::new()),
            pages: 0,
        });
    };

    let mut merged = first.body;
    for (offset, page) in pages.enumerate() {
        merged = match (merged, page.body) {
            (Body::Sequence(mut acc), Body::Sequence(items)) => {
                acc.extend(items);
                Body::Sequence(acc)
            }
            (acc, other) => {
                return Err(FetchError::ShapeMismatch {
                    page: offset + 1,
                    expected: acc.shape(),
                    found: other.shape(),
                })
            }
        };
    }

    Ok(AggregatedResult {
        body: merged,
        pages: count,
    })
}
