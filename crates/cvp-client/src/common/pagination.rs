//! Concurrent pagination for CVP list endpoints
//!
//! CVP list endpoints take a `startIndex`/`endIndex` window and report the
//! total item count alongside each page. Large lists are fetched by probing
//! for the total, splitting `[0, total)` into one window per worker and
//! fetching the windows concurrently.

use crate::error::CvpError;
use crate::models::Page;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;
use tracing::{debug, warn};

/// Split `[0, total)` into at most `workers` contiguous half-open windows
pub fn page_windows(total: u64, workers: usize) -> Vec<(u64, u64)> {
    if total == 0 {
        return Vec::new();
    }
    let workers = workers.max(1) as u64;
    let size = total.div_ceil(workers).max(1);

    let mut windows = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + size).min(total);
        windows.push((start, end));
        start = end;
    }
    windows
}

/// Fetch every item of a paged endpoint with up to `workers` requests in flight
///
/// `fetch(start, end)` must return the items in `[start, end)` together with
/// the endpoint's total count. Results are concatenated in window order, so
/// the merged list has the same order as a single unpaged request.
pub async fn fetch_all_concurrently<T, F, Fut>(fetch: F, workers: usize) -> Result<Vec<T>, CvpError>
where
    F: Fn(u64, u64) -> Fut,
    Fut: Future<Output = Result<Page<T>, CvpError>>,
{
    let workers = workers.max(1);

    let probe = fetch(0, 1).await?;
    let total = probe.total;
    if total == 0 {
        return Ok(Vec::new());
    }
    if total <= probe.data.len() as u64 {
        return Ok(probe.data);
    }

    let windows = page_windows(total, workers);
    debug!("Fetching {} items in {} windows ({} workers)", total, windows.len(), workers);

    let pages: Vec<Page<T>> = stream::iter(windows.into_iter().map(|(start, end)| fetch(start, end)))
        .buffered(workers)
        .try_collect()
        .await?;

    let merged: Vec<T> = pages.into_iter().flat_map(|page| page.data).collect();
    if merged.len() as u64 != total {
        warn!(
            "Paged fetch returned {} items but CVP reported {} (list changed while paging?)",
            merged.len(),
            total
        );
    }

    Ok(merged)
}
