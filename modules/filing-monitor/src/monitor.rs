use std::sync::Arc;

use chrono::{Datelike, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use filing_common::events::EXTRACTION_ERROR_MESSAGE;
use filing_common::{LifecycleEvent, NewFiling, ValidationOutcome};

use crate::retry::{ExtractionFailure, RetryPolicy};
use crate::traits::{DocumentExtractor, EventSink, FilingSource, FilingStore};
use crate::validator::validate;

/// A cycle that ended without storing the latest filing.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Extraction(#[from] ExtractionFailure),

    #[error("validation rejected {document_url}: {reason}")]
    Rejected { document_url: String, reason: String },

    #[error("failed to persist {document_url}: {source}")]
    Persistence {
        document_url: String,
        #[source]
        source: anyhow::Error,
    },
}

/// How a cycle that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The source could not be reached; nothing was published.
    SourceUnavailable,
    /// The source listed no filings for the year.
    NoFilings,
    /// The newest filing was already processed.
    NoNewFilings,
    /// The newest filing was extracted, validated, stored and announced.
    Processed {
        document_url: String,
        warning: Option<String>,
    },
}

/// Polls the disclosure source and processes the newest filing.
///
/// Owns the last-processed document URL. `run_cycle` takes `&mut self`, so at
/// most one cycle can run against a given monitor.
pub struct Monitor {
    source: Arc<dyn FilingSource>,
    extractor: Arc<dyn DocumentExtractor>,
    store: Arc<dyn FilingStore>,
    events: Arc<dyn EventSink>,
    retry: RetryPolicy,
    last_document_url: Option<String>,
}

impl Monitor {
    pub fn new(
        source: Arc<dyn FilingSource>,
        extractor: Arc<dyn DocumentExtractor>,
        store: Arc<dyn FilingStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            source,
            extractor,
            store,
            events,
            retry: RetryPolicy::default(),
            last_document_url: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Document URL of the last filing that was fully processed.
    pub fn last_document_url(&self) -> Option<&str> {
        self.last_document_url.as_deref()
    }

    /// Run one check against the current calendar year.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, MonitorError> {
        let year = Utc::now().year();
        self.run_cycle_for_year(year).await
    }

    pub async fn run_cycle_for_year(&mut self, year: i32) -> Result<CycleOutcome, MonitorError> {
        let filings = match self.source.fetch_filings(year).await {
            Ok(filings) => filings,
            Err(e) => {
                warn!(year, error = %e, "Failed to fetch filings, skipping this cycle");
                return Ok(CycleOutcome::SourceUnavailable);
            }
        };

        let Some(latest) = filings.into_iter().next() else {
            info!(year, "No filings listed");
            self.publish(LifecycleEvent::finished_checking(format!(
                "No filings found for {year}"
            )));
            return Ok(CycleOutcome::NoFilings);
        };

        if self.last_document_url.as_deref() == Some(latest.document_url.as_str()) {
            info!(document_url = %latest.document_url, "No new filings");
            self.publish(LifecycleEvent::finished_checking("No new filings found"));
            return Ok(CycleOutcome::NoNewFilings);
        }

        info!(
            id = latest.id,
            name = %latest.name,
            office = %latest.office,
            document_url = %latest.document_url,
            "New filing found, extracting"
        );

        let record = match self
            .retry
            .extract_with_retry(self.extractor.as_ref(), &latest.document_url)
            .await
        {
            Ok(record) => record,
            Err(failure) => {
                error!(error = %failure, "Extraction exhausted all attempts");
                self.publish(LifecycleEvent::error(EXTRACTION_ERROR_MESSAGE));
                return Err(failure.into());
            }
        };

        let outcome = validate(&record, Some(&latest.name), Some(&latest.office));
        let warning = match outcome {
            ValidationOutcome::Rejected(reason) => {
                warn!(
                    document_url = %latest.document_url,
                    reason = %reason,
                    "Extracted record rejected, discarding"
                );
                self.publish(LifecycleEvent::error(EXTRACTION_ERROR_MESSAGE));
                return Err(MonitorError::Rejected {
                    document_url: latest.document_url,
                    reason,
                });
            }
            ValidationOutcome::AcceptedWithWarning(reason) => Some(reason),
            ValidationOutcome::Accepted => None,
        };

        let stored = self
            .store
            .store(NewFiling {
                document_url: latest.document_url.clone(),
                name: latest.name.clone(),
                office: latest.office.clone(),
                record: record.clone(),
                warning: warning.clone(),
            })
            .await;

        if let Err(e) = stored {
            error!(document_url = %latest.document_url, error = %e, "Failed to store filing");
            self.publish(LifecycleEvent::error(EXTRACTION_ERROR_MESSAGE));
            return Err(MonitorError::Persistence {
                document_url: latest.document_url,
                source: e,
            });
        }

        let message = match &warning {
            Some(reason) => format!("New filing from {} ({reason})", latest.name),
            None => format!("New filing from {}", latest.name),
        };
        self.publish(LifecycleEvent::alert(message, &latest.document_url, record));

        info!(document_url = %latest.document_url, "Filing processed");
        self.last_document_url = Some(latest.document_url.clone());

        Ok(CycleOutcome::Processed {
            document_url: latest.document_url,
            warning,
        })
    }

    fn publish(&self, event: LifecycleEvent) {
        self.events.publish(&event);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use filing_common::EventStatus;

    use super::*;
    use crate::testing::{
        descriptor, record_with, sample_record, MemoryFilingStore, MockExtractor, MockSource,
        RecordingSink,
    };

    struct Harness {
        source: Arc<MockSource>,
        extractor: Arc<MockExtractor>,
        store: Arc<MemoryFilingStore>,
        sink: Arc<RecordingSink>,
        monitor: Monitor,
    }

    fn harness(source: MockSource, extractor: MockExtractor) -> Harness {
        let source = Arc::new(source);
        let extractor = Arc::new(extractor);
        let store = Arc::new(MemoryFilingStore::new());
        let sink = Arc::new(RecordingSink::new());
        let monitor = Monitor::new(
            source.clone(),
            extractor.clone(),
            store.clone(),
            sink.clone(),
        );
        Harness {
            source,
            extractor,
            store,
            sink,
            monitor,
        }
    }

    fn jane() -> filing_common::FilingDescriptor {
        descriptor(20024542, "Doe, Hon.. Jane A.", "CA05")
    }

    #[tokio::test(start_paused = true)]
    async fn new_filing_is_stored_then_announced_then_remembered() {
        let mut h = harness(
            MockSource::new().with_filings(vec![jane(), descriptor(20024001, "Roe, John", "TX12")]),
            MockExtractor::new().always(sample_record("Jane A Doe", "CA05")),
        );

        let outcome = h.monitor.run_cycle_for_year(2024).await.unwrap();

        assert_eq!(
            outcome,
            CycleOutcome::Processed {
                document_url: jane().document_url,
                warning: None,
            }
        );
        assert_eq!(h.store.filings().len(), 1);
        assert_eq!(h.monitor.last_document_url(), Some(jane().document_url.as_str()));

        let events = h.sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, EventStatus::Alert);
        assert_eq!(events[0].document_url.as_deref(), Some(jane().document_url.as_str()));
        assert!(events[0].transaction.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn same_top_filing_twice_does_not_extract_again() {
        let mut h = harness(
            MockSource::new().with_filings(vec![jane()]),
            MockExtractor::new().always(sample_record("Jane A Doe", "CA05")),
        );

        h.monitor.run_cycle_for_year(2024).await.unwrap();
        let second = h.monitor.run_cycle_for_year(2024).await.unwrap();

        assert_eq!(second, CycleOutcome::NoNewFilings);
        assert_eq!(h.extractor.calls(), 1);
        let events = h.sink.events();
        assert_eq!(events.last().unwrap().status, EventStatus::FinishedChecking);
        assert_eq!(events.last().unwrap().message, "No new filings found");
        assert_eq!(h.store.filings().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retried_extraction_is_transparent() {
        let mut h = harness(
            MockSource::new().with_filings(vec![jane()]),
            MockExtractor::new()
                .then_fail("upstream 529")
                .then_fail("no JSON in response")
                .then_return(sample_record("Jane A Doe", "CA05")),
        );

        h.monitor.run_cycle_for_year(2024).await.unwrap();

        assert_eq!(h.extractor.calls(), 3);
        assert_eq!(h.sink.statuses(), vec![EventStatus::Alert]);
    }

    #[tokio::test(start_paused = true)]
    async fn five_failures_emit_one_error_and_no_sixth_call() {
        let mut h = harness(
            MockSource::new().with_filings(vec![jane()]),
            MockExtractor::new().always_fail("model overloaded"),
        );

        let err = h.monitor.run_cycle_for_year(2024).await.unwrap_err();

        assert!(matches!(err, MonitorError::Extraction(ref f) if f.attempts == 5));
        assert_eq!(h.extractor.calls(), 5);
        assert_eq!(h.sink.statuses(), vec![EventStatus::Error]);
        assert_eq!(h.sink.events()[0].message, EXTRACTION_ERROR_MESSAGE);
        assert!(h.store.filings().is_empty());
        assert_eq!(h.monitor.last_document_url(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_record_is_discarded_like_an_extraction_failure() {
        let mut h = harness(
            MockSource::new().with_filings(vec![jane()]),
            MockExtractor::new().always(sample_record("John Roe", "TX12")),
        );

        let err = h.monitor.run_cycle_for_year(2024).await.unwrap_err();

        assert!(matches!(err, MonitorError::Rejected { .. }));
        assert_eq!(h.sink.statuses(), vec![EventStatus::Error]);
        assert!(h.store.filings().is_empty());
        assert_eq!(h.monitor.last_document_url(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn record_without_transactions_is_rejected() {
        let mut h = harness(
            MockSource::new().with_filings(vec![jane()]),
            MockExtractor::new().always(record_with("Jane A Doe", "CA05", Vec::new())),
        );

        let err = h.monitor.run_cycle_for_year(2024).await.unwrap_err();

        assert!(matches!(err, MonitorError::Rejected { ref reason, .. } if reason == "no transactions"));
    }

    #[tokio::test(start_paused = true)]
    async fn persistence_failure_keeps_state_and_retries_next_cycle() {
        let mut h = harness(
            MockSource::new().with_filings(vec![jane()]),
            MockExtractor::new().always(sample_record("Jane A Doe", "CA05")),
        );
        h.store.fail_writes(true);

        let err = h.monitor.run_cycle_for_year(2024).await.unwrap_err();
        assert!(matches!(err, MonitorError::Persistence { .. }));
        assert_eq!(h.monitor.last_document_url(), None);
        assert_eq!(h.sink.statuses(), vec![EventStatus::Error]);

        h.store.fail_writes(false);
        let outcome = h.monitor.run_cycle_for_year(2024).await.unwrap();

        assert!(matches!(outcome, CycleOutcome::Processed { .. }));
        assert_eq!(h.extractor.calls(), 2);
        assert_eq!(h.store.filings().len(), 1);
        assert_eq!(h.monitor.last_document_url(), Some(jane().document_url.as_str()));
        assert_eq!(
            h.sink.statuses(),
            vec![EventStatus::Error, EventStatus::Alert]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn similar_name_is_stored_with_warning() {
        let mut h = harness(
            MockSource::new().with_filings(vec![descriptor(20024542, "Doe, Jane", "CA05")]),
            MockExtractor::new().always(sample_record("Jane Doe Smith", "CA05")),
        );

        let outcome = h.monitor.run_cycle_for_year(2024).await.unwrap();

        let CycleOutcome::Processed { warning, .. } = outcome else {
            panic!("expected processed outcome, got {outcome:?}");
        };
        assert!(warning.is_some());
        assert_eq!(h.store.filings()[0].warning, warning);
        assert!(h.sink.events()[0].message.contains("similar enough"));
    }

    #[tokio::test]
    async fn empty_listing_finishes_checking() {
        let mut h = harness(MockSource::new(), MockExtractor::new());

        let outcome = h.monitor.run_cycle_for_year(2024).await.unwrap();

        assert_eq!(outcome, CycleOutcome::NoFilings);
        assert_eq!(h.sink.statuses(), vec![EventStatus::FinishedChecking]);
        assert_eq!(h.extractor.calls(), 0);
    }

    #[tokio::test]
    async fn source_failure_is_quiet() {
        let mut h = harness(MockSource::new(), MockExtractor::new());
        h.source.fail_with("connection reset");

        let outcome = h.monitor.run_cycle_for_year(2024).await.unwrap();

        assert_eq!(outcome, CycleOutcome::SourceUnavailable);
        assert!(h.sink.events().is_empty());
        assert_eq!(h.source.calls(), 1);
    }

    #[tokio::test]
    async fn newer_filing_replaces_last_seen() {
        let mut h = harness(
            MockSource::new().with_filings(vec![jane()]),
            MockExtractor::new()
                .always(sample_record("Jane A Doe", "CA05")),
        );
        h.monitor = h.monitor.with_retry_policy(RetryPolicy::new(vec![Duration::ZERO]));

        h.monitor.run_cycle_for_year(2024).await.unwrap();

        let newer = descriptor(20024600, "Doe, Jane A.", "CA05");
        h.source.set_filings(vec![newer.clone(), jane()]);
        h.monitor.run_cycle_for_year(2024).await.unwrap();

        assert_eq!(h.monitor.last_document_url(), Some(newer.document_url.as_str()));
        assert_eq!(h.extractor.calls(), 2);
        assert_eq!(h.store.filings().len(), 2);
    }
}
