//! Bounded iteration over paginated list endpoints.
//!
//! The helper never prefetches past one page: every record from page N is
//! handed to the iteratee before page N+1 is requested, which bounds peak
//! memory to a single page plus whatever the caller accumulates, and keeps
//! the cursor resumable on partial failure.

use std::future::Future;

use tracing::{debug, warn};

use crate::JiraError;

/// How a pagination run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The server returned an empty page; the collection is complete.
    Exhausted,
    /// The page budget ran out before the server signaled exhaustion.
    /// More data may exist; the caller chose the bound, so this is a soft
    /// stop with partial data, not an error.
    LimitReached,
}

#[derive(Debug, Clone, Copy)]
pub struct PageRun {
    pub records: usize,
    pub pages: usize,
    pub outcome: PageOutcome,
}

/// Fetch pages of `resource` until the server signals exhaustion or
/// `page_limit` pages have been consumed.
///
/// `fetch_page` receives `(start_at, page_size)` and returns one page; an
/// empty page means end-of-data. `iteratee` is invoked once per record.
pub async fn iterate_pages<T, F, Fut, I>(
    resource: &str,
    page_size: usize,
    page_limit: usize,
    mut fetch_page: F,
    mut iteratee: I,
) -> Result<PageRun, JiraError>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>, JiraError>>,
    I: FnMut(T),
{
    let mut start_at = 0;
    let mut pages = 0;
    let mut records = 0;

    loop {
        if pages >= page_limit {
            warn!(
                resource,
                page_limit,
                records,
                "Page limit reached before the server signaled exhaustion, stopping with partial data"
            );
            return Ok(PageRun {
                records,
                pages,
                outcome: PageOutcome::LimitReached,
            });
        }

        let page = fetch_page(start_at, page_size).await?;
        pages += 1;
        debug!(
            resource,
            page = pages,
            count = page.len(),
            start_at,
            "Fetched page"
        );

        if page.is_empty() {
            return Ok(PageRun {
                records,
                pages,
                outcome: PageOutcome::Exhausted,
            });
        }

        start_at += page.len();
        for record in page {
            iteratee(record);
            records += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// A fetcher that serves `total` records in pages of the requested size,
    /// then an empty page.
    fn finite_page(total: usize, start_at: usize, page_size: usize) -> Vec<u64> {
        (start_at..total.min(start_at + page_size))
            .map(|n| n as u64)
            .collect()
    }

    #[tokio::test]
    async fn yields_every_record_then_terminates_on_empty_page() {
        let fetches = Cell::new(0);
        let seen = Cell::new(0);

        let run = iterate_pages(
            "issues",
            10,
            100,
            |start_at, page_size| {
                fetches.set(fetches.get() + 1);
                let page = finite_page(30, start_at, page_size);
                async move { Ok::<_, JiraError>(page) }
            },
            |_record| seen.set(seen.get() + 1),
        )
        .await
        .unwrap();

        assert_eq!(run.outcome, PageOutcome::Exhausted);
        assert_eq!(run.records, 30);
        assert_eq!(seen.get(), 30);
        // 3 full pages plus the empty terminator.
        assert_eq!(fetches.get(), 4);
    }

    #[tokio::test]
    async fn page_limit_is_a_soft_stop_not_an_error() {
        let fetches = Cell::new(0);

        let run = iterate_pages(
            "issues",
            10,
            5,
            |_start_at, page_size| {
                fetches.set(fetches.get() + 1);
                // Never returns an empty page.
                let page = vec![0u64; page_size];
                async move { Ok::<_, JiraError>(page) }
            },
            |_record| {},
        )
        .await
        .unwrap();

        assert_eq!(run.outcome, PageOutcome::LimitReached);
        assert_eq!(fetches.get(), 5);
        assert_eq!(run.pages, 5);
        assert_eq!(run.records, 50);
    }

    #[tokio::test]
    async fn empty_collection_terminates_after_one_fetch() {
        let fetches = Cell::new(0);

        let run = iterate_pages(
            "users",
            50,
            10,
            |_start_at, _page_size| {
                fetches.set(fetches.get() + 1);
                async { Ok::<Vec<u64>, JiraError>(Vec::new()) }
            },
            |_record| {},
        )
        .await
        .unwrap();

        assert_eq!(run.outcome, PageOutcome::Exhausted);
        assert_eq!(run.records, 0);
        assert_eq!(fetches.get(), 1);
    }

    #[tokio::test]
    async fn fetch_errors_propagate_to_the_caller() {
        let result = iterate_pages(
            "users",
            50,
            10,
            |_start_at, _page_size| async {
                Err::<Vec<u64>, _>(JiraError::Status {
                    status: 500,
                    url: "https://example.atlassian.net".to_string(),
                    retry_after: None,
                })
            },
            |_record: u64| {},
        )
        .await;

        assert!(matches!(result, Err(JiraError::Status { status: 500, .. })));
    }
}
