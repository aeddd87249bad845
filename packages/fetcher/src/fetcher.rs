//! The dataset fetcher: session lifecycle, sequential pagination, and
//! the consumer-facing event stream.
//!
//! [`DatasetFetcher`] enforces single-flight downloads: starting a new
//! download trips the previous session's cancel flag before installing a
//! fresh session, so two sessions never race on shared state. Each
//! session runs on its own spawned task and delivers every progress and
//! terminal signal through its own channel, keeping observers
//! single-threaded consumers no matter where the network I/O happened.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::client::{DatasetClient, HttpPageSource};
use crate::dataset_def::{DatasetDefinition, FetcherConfig, FieldMapping};
use crate::districts::run_districts;
use crate::normalize::normalize_records;
use crate::session::FetchSession;
use crate::{FetchError, FetchEvent, PageSource};

/// Capacity of a session's event channel. A lagging consumer
/// back-pressures the page loop rather than buffering unboundedly.
const EVENT_BUFFER: usize = 32;

/// Downloads one configured dataset and reports progress.
#[derive(Debug)]
pub struct DatasetFetcher {
    definition: DatasetDefinition,
    client: DatasetClient,
    /// Cancel flag of the session currently in flight, if any.
    active: Mutex<Option<Arc<AtomicBool>>>,
}

impl DatasetFetcher {
    /// Creates a fetcher for the given dataset definition.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the HTTP client cannot be built.
    pub fn new(definition: DatasetDefinition) -> Result<Self, FetchError> {
        Ok(Self {
            definition,
            client: DatasetClient::new()?,
            active: Mutex::new(None),
        })
    }

    /// Starts a download session and returns its event stream.
    ///
    /// Callable at any time: any session already in flight is cancelled
    /// and discarded first, then a fresh session begins at offset 0. The
    /// returned receiver yields [`FetchEvent::Progress`] values after
    /// every completed page and exactly one terminal event — unless the
    /// session is cancelled, in which case the channel closes silently.
    pub fn start_download(&self) -> mpsc::Receiver<FetchEvent> {
        let cancel = self.replace_session();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        log::info!("Downloading dataset {}", self.definition.id);

        let client = self.client.clone();
        let config = self.definition.fetcher.clone();
        let fields = self.definition.fields.clone();
        tokio::spawn(async move {
            run_session(client, config, &fields, &cancel, &tx).await;
        });

        rx
    }

    /// Cancels the session currently in flight, if any.
    ///
    /// Cooperative at page granularity: a request already in flight may
    /// complete, but its result is discarded and no further pages are
    /// requested. No further events are emitted for the cancelled
    /// session. Idempotent, and harmless after completion.
    pub fn cancel_download(&self) {
        let active = self
            .active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(flag) = active.as_ref() {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Trips the previous session's cancel flag and installs a new one.
    fn replace_session(&self) -> Arc<AtomicBool> {
        let mut active = self
            .active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(prev) = active.take() {
            prev.store(true, Ordering::Relaxed);
        }
        let cancel = Arc::new(AtomicBool::new(false));
        *active = Some(Arc::clone(&cancel));
        cancel
    }
}

/// Dispatches one session according to the dataset's fetcher strategy.
async fn run_session(
    client: DatasetClient,
    config: FetcherConfig,
    fields: &FieldMapping,
    cancel: &AtomicBool,
    tx: &mpsc::Sender<FetchEvent>,
) {
    match config {
        FetcherConfig::Direct { api_url, page_size } => {
            let source = HttpPageSource::new(client, api_url);
            run_sequential(&source, page_size, fields, cancel, tx).await;
        }
        FetcherConfig::Discovered {
            info_url,
            page_size,
        } => {
            if cancel.load(Ordering::Relaxed) {
                return;
            }
            // The indirection step happens exactly once, before page 0.
            match client.resolve_dataset_url(&info_url).await {
                Ok(url) => {
                    let source = HttpPageSource::new(client, url);
                    run_sequential(&source, page_size, fields, cancel, tx).await;
                }
                Err(e) => {
                    if !cancel.load(Ordering::Relaxed) {
                        let _ = tx.send(FetchEvent::Failed(e)).await;
                    }
                }
            }
        }
        FetcherConfig::Districts {
            page_size,
            resources,
        } => {
            let sources: Vec<(String, Arc<dyn PageSource>)> = resources
                .into_iter()
                .map(|resource| {
                    let source: Arc<dyn PageSource> =
                        Arc::new(HttpPageSource::new(client.clone(), resource.api_url));
                    (resource.district, source)
                })
                .collect();
            run_districts(sources, page_size, fields, cancel, tx).await;
        }
    }
}

/// Runs one sequential pagination session against a page source.
///
/// Strictly ordered: the next page is only requested after the previous
/// response has been observed, since both the continuation offset and
/// the termination decision depend on it. The first failed page ends the
/// session with a single `Failed` event; a short page ends it with
/// normalization and a single `Completed` event.
pub(crate) async fn run_sequential(
    source: &dyn PageSource,
    page_size: u64,
    fields: &FieldMapping,
    cancel: &AtomicBool,
    tx: &mpsc::Sender<FetchEvent>,
) {
    let mut session = FetchSession::new(page_size);

    loop {
        if cancel.load(Ordering::Relaxed) {
            log::debug!("Session cancelled at offset {}", session.page_offset);
            return;
        }

        let page = match source
            .fetch_page(session.page_size, session.page_offset)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                log::warn!("Page fetch at offset {} failed: {e}", session.page_offset);
                if !cancel.load(Ordering::Relaxed) {
                    let _ = tx.send(FetchEvent::Failed(e)).await;
                }
                return;
            }
        };

        // A cancel that landed while the request was in flight discards
        // the result.
        if cancel.load(Ordering::Relaxed) {
            return;
        }

        let batch_len = page.records.len() as u64;
        session.record_page(page.records, page.total_count);

        if tx
            .send(FetchEvent::Progress(session.progress()))
            .await
            .is_err()
        {
            return;
        }

        if session.is_final_page(batch_len) {
            break;
        }
    }

    let bins = normalize_records(&session.accumulated, fields);

    if cancel.load(Ordering::Relaxed) {
        return;
    }
    if tx.send(FetchEvent::Progress(1.0)).await.is_err() {
        return;
    }
    let _ = tx.send(FetchEvent::Completed(bins)).await;
}
