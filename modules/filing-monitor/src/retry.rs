use std::time::Duration;

use anyhow::anyhow;
use thiserror::Error;
use tracing::{info, warn};

use filing_common::ExtractedRecord;

use crate::traits::DocumentExtractor;

/// Delay before each extraction attempt: one immediate try, then retries
/// after 3 minutes, 7 minutes, 30 minutes and 8 hours.
pub const DEFAULT_RETRY_DELAYS: [Duration; 5] = [
    Duration::ZERO,
    Duration::from_secs(3 * 60),
    Duration::from_secs(7 * 60),
    Duration::from_secs(30 * 60),
    Duration::from_secs(8 * 60 * 60),
];

/// Default upper bound on a single extraction attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Every scheduled attempt failed.
#[derive(Debug, Error)]
#[error("extraction of {document_url} failed after {attempts} attempts: {last_error}")]
pub struct ExtractionFailure {
    pub document_url: String,
    pub attempts: usize,
    pub last_error: String,
}

/// Bounded, delay-scheduled retry around a [`DocumentExtractor`].
///
/// Sleeps happen inline, so they suspend only the cycle that is waiting.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
    attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delays: DEFAULT_RETRY_DELAYS.to_vec(),
            attempt_timeout: Some(DEFAULT_ATTEMPT_TIMEOUT),
        }
    }
}

impl RetryPolicy {
    /// One attempt per entry in `delays`; entry `i` is slept before attempt `i`.
    pub fn new(delays: Vec<Duration>) -> Self {
        Self {
            delays,
            attempt_timeout: Some(DEFAULT_ATTEMPT_TIMEOUT),
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    pub fn without_attempt_timeout(mut self) -> Self {
        self.attempt_timeout = None;
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.delays.len()
    }

    pub async fn extract_with_retry(
        &self,
        extractor: &dyn DocumentExtractor,
        document_url: &str,
    ) -> Result<ExtractedRecord, ExtractionFailure> {
        let max_attempts = self.max_attempts();
        let mut last_error = String::from("no attempts scheduled");

        for (index, delay) in self.delays.iter().enumerate() {
            let attempt = index + 1;
            if !delay.is_zero() {
                info!(
                    document_url,
                    attempt,
                    max_attempts,
                    delay_secs = delay.as_secs(),
                    "Waiting before retrying extraction"
                );
                tokio::time::sleep(*delay).await;
            }

            match self.attempt(extractor, document_url).await {
                Ok(record) => {
                    if attempt > 1 {
                        info!(document_url, attempt, "Extraction succeeded after retry");
                    }
                    return Ok(record);
                }
                Err(e) => {
                    warn!(
                        document_url,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Extraction attempt failed"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(ExtractionFailure {
            document_url: document_url.to_string(),
            attempts: max_attempts,
            last_error,
        })
    }

    async fn attempt(
        &self,
        extractor: &dyn DocumentExtractor,
        document_url: &str,
    ) -> anyhow::Result<ExtractedRecord> {
        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, extractor.extract(document_url))
                .await
                .map_err(|_| anyhow!("attempt timed out after {}s", limit.as_secs()))?,
            None => extractor.extract(document_url).await,
        }
    }
}
