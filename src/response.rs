//! Response of a single HTTP call.
//!
//! [`Client::call`](crate::Client::call) returns the parsed JSON body together
//! with the status, headers and latency of the call. The paged data requests
//! use it for every page before the bodies are merged.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A successful HTTP response with its parsed body.
///
/// # Examples
///
/// ```
/// use piapi::Response;
/// use http::{HeaderMap, StatusCode};
/// use std::time::Duration;
///
/// let response = Response::new(
///     serde_json::json!({"queryResponse": {"@count": 0}}),
///     String::new(),
///     StatusCode::OK,
///     HeaderMap::new(),
///     Duration::from_millis(40),
/// );
/// assert_eq!(response["queryResponse"]["@count"], 0);
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The parsed response body.
    pub data: T,

    /// The raw response body.
    pub raw_body: String,

    /// The HTTP status code.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from sending the request to reading the full body.
    pub latency: Duration,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
        }
    }

    /// Consumes the response and returns the body.
    pub fn into_data(self) -> T {
        self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
