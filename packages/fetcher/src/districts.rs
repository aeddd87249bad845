//! Per-district fan-out download strategy.
//!
//! Instead of one sequential cursor, this mode issues a single-page
//! request per district sub-dataset, all concurrently, and joins on the
//! full set before normalizing. Progress is the fraction of sub-dataset
//! requests settled. The merged output is sorted by district key so the
//! final list is deterministic even though requests settle in arbitrary
//! order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::mpsc;

use crate::dataset_def::FieldMapping;
use crate::normalize::normalize_records;
use crate::{FetchError, FetchEvent, PageSource};

/// The closed set of Taipei City administrative districts. District
/// sub-dataset configs must draw their keys from this list.
pub const TAIPEI_DISTRICTS: [&str; 12] = [
    "中正區",
    "大同區",
    "中山區",
    "松山區",
    "大安區",
    "萬華區",
    "信義區",
    "士林區",
    "北投區",
    "內湖區",
    "南港區",
    "文山區",
];

/// Whether `name` is one of the Taipei City administrative districts.
#[must_use]
pub fn is_taipei_district(name: &str) -> bool {
    TAIPEI_DISTRICTS.contains(&name)
}

/// Runs one fan-out session: one concurrent single-page request per
/// district, progress per settled request, then merge-sort-normalize.
///
/// Any failed sub-request fails the whole session (reported once, after
/// all requests settle). A cancelled session stops emitting events at
/// the next settle point and discards everything.
pub(crate) async fn run_districts(
    sources: Vec<(String, Arc<dyn PageSource>)>,
    page_size: u64,
    fields: &FieldMapping,
    cancel: &AtomicBool,
    tx: &mpsc::Sender<FetchEvent>,
) {
    if cancel.load(Ordering::Relaxed) {
        return;
    }

    let total = sources.len();
    let mut requests: FuturesUnordered<_> = sources
        .into_iter()
        .map(|(district, source)| async move {
            let result = source.fetch_page(page_size, 0).await;
            (district, result)
        })
        .collect();

    let mut batches: Vec<(String, Vec<serde_json::Value>)> = Vec::with_capacity(total);
    let mut failure: Option<FetchError> = None;
    let mut settled = 0usize;

    while let Some((district, result)) = requests.next().await {
        if cancel.load(Ordering::Relaxed) {
            return;
        }

        settled += 1;
        match result {
            Ok(page) => {
                log::debug!("District {district}: {} records", page.records.len());
                batches.push((district, page.records));
            }
            Err(e) => {
                log::warn!("District {district} fetch failed: {e}");
                failure.get_or_insert(e);
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let progress = settled as f64 / total as f64;
        if tx.send(FetchEvent::Progress(progress)).await.is_err() {
            return;
        }
    }

    if cancel.load(Ordering::Relaxed) {
        return;
    }

    if let Some(e) = failure {
        let _ = tx.send(FetchEvent::Failed(e)).await;
        return;
    }

    // Requests settle in arbitrary order; sort so the output is stable.
    batches.sort_by(|a, b| a.0.cmp(&b.0));
    let merged: Vec<serde_json::Value> = batches.into_iter().flat_map(|(_, records)| records).collect();

    let bins = normalize_records(&merged, fields);
    let _ = tx.send(FetchEvent::Completed(bins)).await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::RawPage;

    /// Returns one fixed page after an optional delay, or fails.
    struct DistrictStub {
        records: Vec<serde_json::Value>,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl PageSource for DistrictStub {
        async fn fetch_page(&self, _limit: u64, _offset: u64) -> Result<RawPage, FetchError> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(FetchError::Parse {
                    message: "scripted failure".to_string(),
                });
            }
            Ok(RawPage {
                records: self.records.clone(),
                total_count: None,
            })
        }
    }

    fn record(street: &str) -> serde_json::Value {
        serde_json::json!({ "緯度": "25.03", "經度": "121.56", "路名": street })
    }

    fn fields() -> FieldMapping {
        FieldMapping {
            lat: "緯度".to_string(),
            lng: "經度".to_string(),
            street: "路名".to_string(),
            annotation: "段號及其他註明".to_string(),
        }
    }

    fn stub(street: &str, delay_ms: u64) -> Arc<dyn PageSource> {
        Arc::new(DistrictStub {
            records: vec![record(street)],
            delay: Duration::from_millis(delay_ms),
            fail: false,
        })
    }

    async fn drain(mut rx: mpsc::Receiver<FetchEvent>) -> Vec<FetchEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[test]
    fn the_district_set_is_closed_and_unique() {
        assert_eq!(TAIPEI_DISTRICTS.len(), 12);
        let mut names = TAIPEI_DISTRICTS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 12);
        assert!(is_taipei_district("中正區"));
        assert!(!is_taipei_district("板橋區"));
    }

    #[tokio::test]
    async fn merged_output_is_sorted_by_district_not_completion_order() {
        // 中正區 sorts before 大同區 but settles last.
        let sources = vec![
            ("中正區".to_string(), stub("甲路", 100)),
            ("大同區".to_string(), stub("乙路", 0)),
        ];

        let (tx, rx) = mpsc::channel(32);
        let cancel = AtomicBool::new(false);
        run_districts(sources, 1000, &fields(), &cancel, &tx).await;
        drop(tx);

        let events = drain(rx).await;
        let progress: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                FetchEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![0.5, 1.0]);

        let Some(FetchEvent::Completed(bins)) = events.last() else {
            panic!("expected a Completed event, got {events:?}");
        };
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].address, "甲路");
        assert_eq!(bins[1].address, "乙路");
    }

    #[tokio::test]
    async fn one_failed_district_fails_the_session_after_all_settle() {
        let failing: Arc<dyn PageSource> = Arc::new(DistrictStub {
            records: Vec::new(),
            delay: Duration::ZERO,
            fail: true,
        });
        let sources = vec![
            ("中正區".to_string(), failing),
            ("大同區".to_string(), stub("乙路", 50)),
        ];

        let (tx, rx) = mpsc::channel(32);
        let cancel = AtomicBool::new(false);
        run_districts(sources, 1000, &fields(), &cancel, &tx).await;
        drop(tx);

        let events = drain(rx).await;
        assert!(matches!(events.last(), Some(FetchEvent::Failed(_))));
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, FetchEvent::Completed(_)))
        );
    }

    #[tokio::test]
    async fn a_cancelled_session_emits_nothing() {
        let sources = vec![("中正區".to_string(), stub("甲路", 0))];

        let (tx, rx) = mpsc::channel(32);
        let cancel = AtomicBool::new(true);
        run_districts(sources, 1000, &fields(), &cancel, &tx).await;
        drop(tx);

        assert!(drain(rx).await.is_empty());
    }
}
