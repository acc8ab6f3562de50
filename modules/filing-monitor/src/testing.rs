// Test mocks for the monitor pipeline.
//
// One mock per trait boundary:
// - MockSource (FilingSource): settable listing or failure
// - MockExtractor (DocumentExtractor): scripted results, then a fallback
// - MemoryFilingStore (FilingStore): in-memory rows with read/write failure switches
// - RecordingSink (EventSink): keeps every published event
//
// Plus helpers for building descriptors and records.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use filing_common::{
    EventStatus, ExtractedRecord, FilingDescriptor, FilingInfo, LifecycleEvent, NewFiling,
    StoredFiling, TransactionEntry,
};

use crate::traits::{DocumentExtractor, EventSink, FilingSource, FilingStore};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// A descriptor whose document URL is derived from `id`.
pub fn descriptor(id: u64, name: &str, office: &str) -> FilingDescriptor {
    FilingDescriptor {
        id,
        name: name.to_string(),
        office: office.to_string(),
        filing_year: 2024,
        document_url: format!(
            "https://disclosures-clerk.house.gov/public_disc/ptr-pdfs/2024/{id}.pdf"
        ),
    }
}

pub fn transaction(asset: &str, transaction_type: &str, amount: &str) -> TransactionEntry {
    TransactionEntry {
        owner_id: "SP".to_string(),
        asset: asset.to_string(),
        transaction_type: transaction_type.to_string(),
        date: "01/16/2024".to_string(),
        amount: amount.to_string(),
    }
}

pub fn record_with(name: &str, office: &str, transactions: Vec<TransactionEntry>) -> ExtractedRecord {
    ExtractedRecord {
        filing_information: FilingInfo {
            name: name.to_string(),
            status: "Member".to_string(),
            state_district: office.to_string(),
        },
        transactions,
    }
}

/// A record with one purchase.
pub fn sample_record(name: &str, office: &str) -> ExtractedRecord {
    record_with(
        name,
        office,
        vec![transaction("NVIDIA Corporation (NVDA) [ST]", "P", "$15,001 - $50,000")],
    )
}

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

/// Returns whatever listing (or failure) was last set. Empty by default.
pub struct MockSource {
    listing: Mutex<std::result::Result<Vec<FilingDescriptor>, String>>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            listing: Mutex::new(Ok(Vec::new())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_filings(self, filings: Vec<FilingDescriptor>) -> Self {
        self.set_filings(filings);
        self
    }

    pub fn set_filings(&self, filings: Vec<FilingDescriptor>) {
        *self.listing.lock().unwrap() = Ok(filings);
    }

    pub fn fail_with(&self, message: &str) {
        *self.listing.lock().unwrap() = Err(message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FilingSource for MockSource {
    async fn fetch_filings(&self, _year: i32) -> Result<Vec<FilingDescriptor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.listing
            .lock()
            .unwrap()
            .clone()
            .map_err(|message| anyhow!("MockSource: {message}"))
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Scripted {
    Return(ExtractedRecord),
    Fail(String),
    Hang,
}

/// Plays back scripted results in order, then repeats the fallback.
/// Builder pattern: `.then_return()`, `.then_fail()`, `.then_hang()`,
/// `.always()`, `.always_fail()`.
pub struct MockExtractor {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Option<Scripted>,
    calls: AtomicUsize,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn then_return(self, record: ExtractedRecord) -> Self {
        self.push(Scripted::Return(record))
    }

    pub fn then_fail(self, message: &str) -> Self {
        self.push(Scripted::Fail(message.to_string()))
    }

    /// Next call never completes.
    pub fn then_hang(self) -> Self {
        self.push(Scripted::Hang)
    }

    pub fn always(mut self, record: ExtractedRecord) -> Self {
        self.fallback = Some(Scripted::Return(record));
        self
    }

    pub fn always_fail(mut self, message: &str) -> Self {
        self.fallback = Some(Scripted::Fail(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn push(self, step: Scripted) -> Self {
        self.script.lock().unwrap().push_back(step);
        self
    }
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentExtractor for MockExtractor {
    async fn extract(&self, document_url: &str) -> Result<ExtractedRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.clone());

        match step {
            Some(Scripted::Return(record)) => Ok(record),
            Some(Scripted::Fail(message)) => bail!("MockExtractor: {message}"),
            Some(Scripted::Hang) => std::future::pending().await,
            None => bail!("MockExtractor: nothing scripted for {document_url}"),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryFilingStore
// ---------------------------------------------------------------------------

pub struct MemoryFilingStore {
    filings: Mutex<Vec<StoredFiling>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryFilingStore {
    pub fn new() -> Self {
        Self {
            filings: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Make subsequent `store` calls fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `fetch_latest` calls fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn filings(&self) -> Vec<StoredFiling> {
        self.filings.lock().unwrap().clone()
    }
}

impl Default for MemoryFilingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FilingStore for MemoryFilingStore {
    async fn store(&self, filing: NewFiling) -> Result<StoredFiling> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("MemoryFilingStore: write failure for {}", filing.document_url);
        }
        let stored = StoredFiling {
            id: Uuid::new_v4(),
            document_url: filing.document_url,
            name: filing.name,
            office: filing.office,
            record: filing.record,
            warning: filing.warning,
            created_at: Utc::now(),
        };
        self.filings.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn fetch_latest(&self) -> Result<Option<StoredFiling>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("MemoryFilingStore: read failure");
        }
        Ok(self.filings.lock().unwrap().last().cloned())
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

pub struct RecordingSink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<EventStatus> {
        self.events().iter().map(|e| e.status).collect()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: &LifecycleEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
