#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Paginated open-data dataset fetcher.
//!
//! The Taipei trash-bin dataset is only reachable through a page-limited
//! API, so downloading it means walking `limit`/`offset` pages until a
//! short page signals the end, then converting the accumulated raw
//! records into typed [`TrashBin`](trash_map_fetcher_models::TrashBin)
//! values. [`fetcher::DatasetFetcher`] owns that whole lifecycle and
//! reports fractional progress plus a single terminal outcome over a
//! [`FetchEvent`] stream.
//!
//! Dataset locations, paging strategy, and raw field names are
//! config-driven ([`dataset_def`], [`registry`]), so the same loop serves
//! the discovered-URL dataset and the fixed per-district fan-out variant.

pub mod client;
pub mod dataset_def;
pub mod districts;
pub mod fetcher;
pub mod normalize;
pub mod registry;
pub mod session;

use async_trait::async_trait;
use trash_map_fetcher_models::TrashBin;

/// Errors that can occur while downloading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed, timed out, or returned a non-2xx status.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not valid JSON or lacked a required key path.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what was malformed.
        message: String,
    },

    /// A dataset definition is invalid.
    #[error("Invalid dataset definition: {message}")]
    Config {
        /// Description of what was rejected.
        message: String,
    },
}

/// One page of raw records as returned by the remote API.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// The raw record batch, in API order.
    pub records: Vec<serde_json::Value>,
    /// Total record count across all pages, if the API reported one.
    pub total_count: Option<u64>,
}

/// A source of dataset pages.
///
/// The session loop only ever talks to this trait, which keeps the
/// pagination and termination logic independent of the HTTP transport
/// ([`client::HttpPageSource`] is the production implementation).
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches the page of up to `limit` records starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request or response parsing fails.
    async fn fetch_page(&self, limit: u64, offset: u64) -> Result<RawPage, FetchError>;
}

/// An event emitted by an in-flight download session.
///
/// Every non-cancelled session emits zero or more `Progress` values
/// followed by exactly one terminal event (`Completed` or `Failed`).
/// A cancelled session emits nothing further; its channel simply closes.
#[derive(Debug)]
pub enum FetchEvent {
    /// Fraction of the download completed, in `[0.0, 1.0]`. Monotonically
    /// non-decreasing within a session; reaches 1.0 at termination.
    Progress(f64),
    /// Terminal: the full normalized record list.
    Completed(Vec<TrashBin>),
    /// Terminal: the session failed and no records will be delivered.
    Failed(FetchError),
}
