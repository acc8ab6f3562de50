// Trait seams for the monitor's collaborators.
//
// FilingSource, DocumentExtractor and FilingStore wrap the network and the
// database; EventSink decouples the monitor from how events reach clients.
// The mocks in `testing` implement all four, so the pipeline runs in tests
// with no network and no Postgres.

use anyhow::Result;
use async_trait::async_trait;

use filing_common::{ExtractedRecord, FilingDescriptor, LifecycleEvent, NewFiling, StoredFiling};

// ---------------------------------------------------------------------------
// FilingSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FilingSource: Send + Sync {
    /// Periodic-transaction filings published in `year`, newest first.
    async fn fetch_filings(&self, year: i32) -> Result<Vec<FilingDescriptor>>;
}

// ---------------------------------------------------------------------------
// DocumentExtractor
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Download the document at `document_url` and turn it into a record.
    /// Each call starts from scratch.
    async fn extract(&self, document_url: &str) -> Result<ExtractedRecord>;
}

// ---------------------------------------------------------------------------
// FilingStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FilingStore: Send + Sync {
    /// Append an accepted filing.
    async fn store(&self, filing: NewFiling) -> Result<StoredFiling>;

    /// The most recently stored filing, if any.
    async fn fetch_latest(&self) -> Result<Option<StoredFiling>>;
}

// ---------------------------------------------------------------------------
// EventSink
// ---------------------------------------------------------------------------

/// Receives lifecycle events. Delivery problems stay inside the sink.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &LifecycleEvent);
}
