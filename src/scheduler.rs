//! Batched fan-out of page requests.
//!
//! Pages are sent in batches of at most `concurrent_requests`. Every request of
//! a batch runs on its own tokio task and the whole batch is joined before the
//! scheduler sleeps for `hold` and starts the next one. No pause follows the
//! last batch.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// Sends page requests in rate-limited batches.
#[derive(Debug, Clone, Copy)]
pub struct BatchScheduler {
    concurrent_requests: usize,
    hold: Duration,
}

impl BatchScheduler {
    /// Creates a scheduler. A `concurrent_requests` of zero is treated as one.
    pub fn new(concurrent_requests: usize, hold: Duration) -> Self {
        Self {
            concurrent_requests: concurrent_requests.max(1),
            hold,
        }
    }

    /// Splits the ordered `pages` into batches.
    ///
    /// Batches are built on demand, so even an open-ended range never holds
    /// more than the next batch in memory.
    ///
    /// # Examples
    ///
    /// ```
    /// use piapi::scheduler::BatchScheduler;
    /// use std::time::Duration;
    ///
    /// let scheduler = BatchScheduler::new(3, Duration::from_secs(1));
    /// let sizes: Vec<usize> = scheduler.batches(1..8).map(|b| b.len()).collect();
    /// assert_eq!(sizes, vec![3, 3, 1]);
    /// ```
    pub fn batches<I>(&self, pages: I) -> Batches<I::IntoIter>
    where
        I: IntoIterator<Item = u64>,
    {
        Batches {
            pages: pages.into_iter(),
            size: self.concurrent_requests,
        }
    }

    /// Fetches every page with `fetch` and returns the results in page order.
    ///
    /// If any request of a batch fails, the remaining requests of that batch
    /// are still awaited, then the run fails with [`Error::PageFailed`] for the
    /// lowest failing page. Later batches are not started.
    pub async fn run<T, F, Fut>(
        &self,
        pages: impl IntoIterator<Item = u64>,
        fetch: F,
    ) -> Result<Vec<T>>
    where
        T: Send + 'static,
        F: Fn(u64) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut batches = self.batches(pages).peekable();
        let mut results = Vec::new();
        let mut index = 0usize;

        while let Some(batch) = batches.next() {
            index += 1;
            tracing::info!(
                batch = index,
                size = batch.len(),
                first_page = batch.first().copied().unwrap_or_default(),
                "Sending page batch"
            );

            let handles: Vec<_> = batch
                .iter()
                .map(|&page| (page, tokio::spawn(fetch(page))))
                .collect();

            let mut first_failure = None;
            for (page, handle) in handles {
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(Error::Worker(e.to_string())),
                };
                match outcome {
                    Ok(value) => results.push(value),
                    Err(e) => {
                        tracing::warn!(page = page, error = %e, "Page request failed");
                        if first_failure.is_none() {
                            first_failure = Some(Error::PageFailed {
                                page,
                                source: Box::new(e),
                            });
                        }
                    }
                }
            }

            if let Some(e) = first_failure {
                return Err(e);
            }

            if batches.peek().is_some() && !self.hold.is_zero() {
                tracing::debug!(hold_ms = self.hold.as_millis(), "Holding before next batch");
                tokio::time::sleep(self.hold).await;
            }
        }

        Ok(results)
    }
}

/// Iterator over the batches of a [`BatchScheduler`], see
/// [`BatchScheduler::batches`].
#[derive(Debug)]
pub struct Batches<I> {
    pages: I,
    size: usize,
}

impl<I: Iterator<Item = u64>> Iterator for Batches<I> {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Vec<u64>> {
        let batch: Vec<u64> = self.pages.by_ref().take(self.size).collect();
        (!batch.is_empty()).then_some(batch)
    }
}
