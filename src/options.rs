//! Per-request options for paging, rate limiting and caching.
//!
//! The API throttles clients that send too many requests at once. Paged data
//! requests are therefore sent in batches of `concurrent_requests`, with a
//! `hold` pause between batches.

use crate::{Error, Result};
use std::time::Duration;

/// Default number of entries requested per page.
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

/// Default number of page requests in flight at once.
pub const DEFAULT_CONCURRENT_REQUESTS: usize = 5;

/// Default pause between two batches of page requests.
pub const DEFAULT_HOLD: Duration = Duration::from_secs(1);

/// Default time to wait for a single response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Options for a single call to [`Client::request`](crate::Client::request).
///
/// # Examples
///
/// ```
/// use piapi::RequestOptions;
/// use std::time::Duration;
///
/// let options = RequestOptions::builder()
///     .paging_size(500)
///     .concurrent_requests(3)
///     .hold(Duration::from_millis(1500))
///     .check_cache(false)
///     .build();
///
/// assert_eq!(options.paging_size, 500);
/// assert!(options.virtual_domain.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Number of entries per page. Defaults to [`DEFAULT_PAGE_SIZE`].
    pub paging_size: u64,

    /// Maximum number of page requests in flight at once.
    ///
    /// Defaults to [`DEFAULT_CONCURRENT_REQUESTS`].
    pub concurrent_requests: usize,

    /// Pause between batches of page requests. Defaults to [`DEFAULT_HOLD`].
    pub hold: Duration,

    /// Per-request timeout. `None` uses the client's default timeout.
    pub timeout: Option<Duration>,

    /// Whether a cached result may be returned instead of calling the API.
    ///
    /// Defaults to `true`. Bypassing the cache still stores the fresh result.
    pub check_cache: bool,

    /// Virtual domain for this call only. `None` uses the session domain.
    pub virtual_domain: Option<String>,

    /// Whether a successful call makes `virtual_domain` the session domain.
    ///
    /// Defaults to `false`.
    pub persist_virtual_domain: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            paging_size: DEFAULT_PAGE_SIZE,
            concurrent_requests: DEFAULT_CONCURRENT_REQUESTS,
            hold: DEFAULT_HOLD,
            timeout: None,
            check_cache: true,
            virtual_domain: None,
            persist_virtual_domain: false,
        }
    }
}

impl RequestOptions {
    /// Creates a new builder for request options.
    pub fn builder() -> RequestOptionsBuilder {
        RequestOptionsBuilder::default()
    }

    /// Checks that the paging parameters can produce a schedule.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.paging_size == 0 {
            return Err(Error::ConfigurationError(
                "paging_size must be greater than zero".to_string(),
            ));
        }
        if self.concurrent_requests == 0 {
            return Err(Error::ConfigurationError(
                "concurrent_requests must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`RequestOptions`].
#[derive(Default)]
pub struct RequestOptionsBuilder {
    paging_size: Option<u64>,
    concurrent_requests: Option<usize>,
    hold: Option<Duration>,
    timeout: Option<Duration>,
    check_cache: Option<bool>,
    virtual_domain: Option<String>,
    persist_virtual_domain: Option<bool>,
}

impl RequestOptionsBuilder {
    /// Sets the number of entries per page.
    pub fn paging_size(mut self, paging_size: u64) -> Self {
        self.paging_size = Some(paging_size);
        self
    }

    /// Sets the number of page requests sent concurrently.
    pub fn concurrent_requests(mut self, concurrent_requests: usize) -> Self {
        self.concurrent_requests = Some(concurrent_requests);
        self
    }

    /// Sets the pause between batches.
    pub fn hold(mut self, hold: Duration) -> Self {
        self.hold = Some(hold);
        self
    }

    /// Overrides the client's timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets whether the cache is consulted.
    pub fn check_cache(mut self, check_cache: bool) -> Self {
        self.check_cache = Some(check_cache);
        self
    }

    /// Sends this call in the given virtual domain.
    pub fn virtual_domain(mut self, domain: impl Into<String>) -> Self {
        self.virtual_domain = Some(domain.into());
        self
    }

    /// Keeps the virtual domain of this call as the session domain on success.
    pub fn persist_virtual_domain(mut self, persist: bool) -> Self {
        self.persist_virtual_domain = Some(persist);
        self
    }

    /// Builds the `RequestOptions`.
    pub fn build(self) -> RequestOptions {
        let default = RequestOptions::default();
        RequestOptions {
            paging_size: self.paging_size.unwrap_or(default.paging_size),
            concurrent_requests: self
                .concurrent_requests
                .unwrap_or(default.concurrent_requests),
            hold: self.hold.unwrap_or(default.hold),
            timeout: self.timeout.or(default.timeout),
            check_cache: self.check_cache.unwrap_or(default.check_cache),
            virtual_domain: self.virtual_domain.or(default.virtual_domain),
            persist_virtual_domain: self
                .persist_virtual_domain
                .unwrap_or(default.persist_virtual_domain),
        }
    }
}
