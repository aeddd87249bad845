//! Per-download session state.
//!
//! A [`FetchSession`] lives for exactly one download attempt: it owns the
//! raw-record accumulator, the pagination cursor, and the progress
//! bookkeeping. Starting a new download always builds a fresh session;
//! sessions are never reused or shared.

/// Mutable state for one in-flight download.
#[derive(Debug)]
pub struct FetchSession {
    /// Raw record batches in the order pages were received.
    pub accumulated: Vec<serde_json::Value>,
    /// Offset of the next page to request.
    pub page_offset: u64,
    /// Fixed per-session page limit.
    pub page_size: u64,
    /// `ceil(total_count / page_size)`, derived once from the first page
    /// that reports a positive total count.
    pub expected_pages: Option<u64>,
    /// Pages successfully fetched so far.
    pub completed_pages: u64,
}

impl FetchSession {
    /// Creates a session with the cursor at the start of the dataset.
    #[must_use]
    pub const fn new(page_size: u64) -> Self {
        Self {
            accumulated: Vec::new(),
            page_offset: 0,
            page_size,
            expected_pages: None,
            completed_pages: 0,
        }
    }

    /// Applies one successfully fetched page: appends the batch, advances
    /// the cursor by `page_size`, and derives `expected_pages` from the
    /// reported total count if this is the first page to carry one.
    pub fn record_page(&mut self, records: Vec<serde_json::Value>, total_count: Option<u64>) {
        if self.completed_pages == 0
            && let Some(count) = total_count
            && count > 0
        {
            self.expected_pages = Some(count.div_ceil(self.page_size));
        }

        self.accumulated.extend(records);
        self.page_offset += self.page_size;
        self.completed_pages += 1;
    }

    /// Whether a page of `batch_len` records ends the session. A short
    /// page (strictly fewer than `page_size` records, including zero) is
    /// the end of the dataset; a full page always means another request,
    /// even when that risks a redundant trailing empty one.
    #[must_use]
    pub const fn is_final_page(&self, batch_len: u64) -> bool {
        batch_len < self.page_size
    }

    /// Current progress fraction in `[0.0, 1.0]`.
    ///
    /// Determinate when the API reported a total count
    /// (`completed / expected`, capped at 1.0 in case the count was
    /// stale); otherwise an indeterminate-but-monotonic fraction that
    /// approaches 1.0 and reaches it only at termination.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        let completed = self.completed_pages as f64;
        self.expected_pages.map_or_else(
            || completed / (completed + 1.0),
            |expected| (completed / expected as f64).min(1.0),
        )
    }
}
