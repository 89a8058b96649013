//! # piapi - a client for the Prime Infrastructure REST API
//!
//! `piapi` wraps the Cisco Prime Infrastructure REST API behind a single
//! [`Client`]. The API exposes two kinds of resources:
//!
//! - **Data resources** return collected data. They are paged by the server,
//!   so the client reads the first page, plans the remaining ones, fetches
//!   them in rate-limited batches and merges everything into one result. Merged
//!   results are cached per client.
//! - **Action resources** change the server configuration. They are called
//!   once per request and never cached.
//!
//! ## Quick Start
//!
//! ```no_run
//! use piapi::{Client, RequestOptions};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), piapi::Error> {
//!     let client = Client::builder()
//!         .host("prime.example.com")?
//!         .credentials("admin", "secret")
//!         .timeout(Duration::from_secs(120))
//!         .build()?;
//!
//!     println!("Data resources: {:?}", client.data_resources().await?);
//!
//!     let options = RequestOptions::builder()
//!         .paging_size(1000)
//!         .concurrent_requests(5)
//!         .hold(Duration::from_secs(1))
//!         .build();
//!     let devices = client.request("Devices", &json!({}), &options).await?;
//!     println!("{} devices", devices["queryResponse"]["@count"]);
//!
//!     // Served from the cache
//!     let again = client.request("Devices", &json!({}), &options).await?;
//!     assert_eq!(devices, again);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Rate limiting
//!
//! The API rejects clients that send too many requests at once (`503`). Paged
//! requests are sent in batches of [`RequestOptions::concurrent_requests`]
//! with a [`RequestOptions::hold`] pause between batches. Failed requests are
//! never retried automatically: a failing page fails the whole call and
//! nothing is cached.
//!
//! ## Virtual domains
//!
//! [`Client::set_virtual_domain`] changes the session domain used by every
//! later call. [`RequestOptions::virtual_domain`] applies a domain to one call
//! only, unless [`RequestOptions::persist_virtual_domain`] is set.

pub mod cache;
mod client;
mod error;
pub mod merge;
pub mod metadata;
mod options;
pub mod paging;
pub mod resource;
mod response;
pub mod scheduler;

pub use cache::{CacheEntry, CacheKey, ResponseCache};
pub use client::{Client, ClientBuilder, API_ROOT};
pub use error::{Error, Result};
pub use metadata::{QueryParams, RequestDescriptor};
pub use options::{
    RequestOptions, RequestOptionsBuilder, DEFAULT_CONCURRENT_REQUESTS, DEFAULT_HOLD,
    DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT,
};
pub use resource::{Resource, ResourceCatalog, ResourceKind};
pub use response::Response;
