//! Error types for Prime Infrastructure API calls.
//!
//! Every failure of [`Client::request`](crate::Client::request) surfaces as an
//! [`Error`]. Nothing is swallowed and nothing is retried automatically; the
//! caller decides whether to re-invoke the request.

use http::{HeaderMap, StatusCode};

/// The main error type for API calls.
///
/// # Examples
///
/// ```no_run
/// use piapi::{Client, Error, RequestOptions};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .host("prime.example.com")?
///     .credentials("admin", "secret")
///     .build()?;
///
/// match client
///     .request("Devices", &serde_json::json!({}), &RequestOptions::default())
///     .await
/// {
///     Ok(devices) => println!("{}", devices),
///     Err(Error::PageFailed { page, source }) => {
///         eprintln!("page {} failed: {}", page, source);
///     }
///     Err(Error::PaginationIntegrity { expected, actual }) => {
///         eprintln!("server reported {} items, got {}", expected, actual);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection refused, TLS handshake, DNS, ...).
    #[error("Network error: {0}")]
    Network(reqwest::Error),

    /// The request did not complete within the configured timeout.
    ///
    /// The inner error carries the URL of the request that timed out.
    #[error("Request timed out: {0}")]
    Timeout(reqwest::Error),

    /// The server returned a non-2xx HTTP status code.
    ///
    /// See [`Error::reason`] for the vendor's description of the status and
    /// [`Error::api_message`] for the message carried in the error document.
    #[error("HTTP error {status}: {raw_response}")]
    HttpError {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        raw_response: String,
        /// The response headers
        headers: HeaderMap,
    },

    /// The response body was not JSON, or an expected field was missing.
    #[error("Malformed response: {reason}")]
    MalformedResponse {
        /// What was wrong with the body
        reason: String,
        /// The raw response body
        raw_response: String,
    },

    /// The merged item count does not match the total reported by the server.
    #[error("Pagination integrity error: server reported {expected} items, merged {actual}")]
    PaginationIntegrity {
        /// Total reported by the first page
        expected: u64,
        /// Number of items collected across all pages
        actual: u64,
    },

    /// A single page of a paged data request failed.
    ///
    /// Page `0` is the first request, which also reports the total count.
    #[error("Page {page} failed: {source}")]
    PageFailed {
        /// Index of the failing page
        page: u64,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },

    /// The resource name is neither a known data resource nor a known action.
    #[error("Resource '{0}' not found in the API")]
    UnknownResource(String),

    /// The resource exists but was requested through the wrong entry point.
    #[error("Resource '{name}' is not a {expected} resource")]
    WrongResourceKind {
        /// The resource name
        name: String,
        /// The kind the caller asked for
        expected: &'static str,
    },

    /// Invalid configuration was provided to the client or to a request.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A page worker task panicked or was cancelled.
    #[error("Worker failed: {0}")]
    Worker(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e)
        } else {
            Error::Network(e)
        }
    }
}

impl Error {
    /// Returns the HTTP status code if this error has one.
    ///
    /// Page failures report the status of the page that failed.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpError { status, .. } => Some(*status),
            Error::PageFailed { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::HttpError { raw_response, .. } => Some(raw_response),
            Error::MalformedResponse { raw_response, .. } => Some(raw_response),
            Error::PageFailed { source, .. } => source.raw_response(),
            _ => None,
        }
    }

    /// Returns the index of the failing page for paged data requests.
    pub fn page(&self) -> Option<u64> {
        match self {
            Error::PageFailed { page, .. } => Some(*page),
            _ => None,
        }
    }

    /// Describes the HTTP status the way the API documentation does.
    ///
    /// # Examples
    ///
    /// ```
    /// use piapi::Error;
    /// use http::StatusCode;
    ///
    /// let err = Error::HttpError {
    ///     status: StatusCode::SERVICE_UNAVAILABLE,
    ///     raw_response: String::new(),
    ///     headers: http::HeaderMap::new(),
    /// };
    /// assert!(err.reason().unwrap().contains("rate limiting"));
    /// ```
    pub fn reason(&self) -> Option<&'static str> {
        self.status().map(status_reason)
    }

    /// Extracts `errorDocument.message` from the response body, if any.
    ///
    /// The API returns this document with `400 Bad Request` responses.
    pub fn api_message(&self) -> Option<String> {
        let body: serde_json::Value = serde_json::from_str(self.raw_response()?).ok()?;
        body.pointer("/errorDocument/message")?
            .as_str()
            .map(str::to_owned)
    }
}

fn status_reason(status: StatusCode) -> &'static str {
    match status.as_u16() {
        302 => "Incorrect credentials provided",
        400 => "Invalid request",
        401 => "Unauthorized access",
        403 => "Forbidden access to the REST API",
        404 => "URL not found",
        406 => "The Accept header sent in the request does not match a supported type",
        415 => "The Content-Type header sent in the request does not match a supported type",
        500 => "An error has occurred during the API invocation",
        502 => "The server is down or being upgraded",
        503 => "The servers are up, but overloaded with requests (rate limiting)",
        _ => "Unknown request error",
    }
}

/// A specialized `Result` type for API calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn http_error(status: StatusCode, body: &str) -> Error {
        Error::HttpError {
            status,
            raw_response: body.to_string(),
            headers: HeaderMap::new(),
        }
    }

    #[test]
    fn test_api_message_from_error_document() {
        let err = http_error(
            StatusCode::BAD_REQUEST,
            r#"{"errorDocument":{"httpResponseCode":400,"message":"Unknown filter 'foo'"}}"#,
        );
        assert_eq!(err.api_message().as_deref(), Some("Unknown filter 'foo'"));
        assert_eq!(err.reason(), Some("Invalid request"));
    }

    #[test]
    fn test_api_message_absent_for_plain_body() {
        let err = http_error(StatusCode::BAD_GATEWAY, "down");
        assert_eq!(err.api_message(), None);
        assert_eq!(err.reason(), Some("The server is down or being upgraded"));
    }

    #[test]
    fn test_page_failure_exposes_inner_status() {
        let err = Error::PageFailed {
            page: 3,
            source: Box::new(http_error(StatusCode::SERVICE_UNAVAILABLE, "busy")),
        };
        assert_eq!(err.page(), Some(3));
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(err.raw_response(), Some("busy"));
        assert!(err.to_string().starts_with("Page 3 failed"));
    }

    #[test]
    fn test_unknown_status_reason() {
        let err = http_error(StatusCode::IM_A_TEAPOT, "");
        assert_eq!(err.reason(), Some("Unknown request error"));
        assert_eq!(Error::Worker("cancelled".to_string()).reason(), None);
    }
}
