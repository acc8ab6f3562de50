//! Lifecycle events published by the monitor to live subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ExtractedRecord;

/// Message sent with every `error` event. Subscribers never see the cause.
pub const EXTRACTION_ERROR_MESSAGE: &str = "Failed to process the latest filing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventStatus {
    Alert,
    Error,
    FinishedChecking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    pub status: EventStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<ExtractedRecord>,
}

impl LifecycleEvent {
    fn new(status: EventStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            time: Some(Utc::now()),
            document_url: None,
            transaction: None,
        }
    }

    pub fn alert(
        message: impl Into<String>,
        document_url: impl Into<String>,
        record: ExtractedRecord,
    ) -> Self {
        Self {
            document_url: Some(document_url.into()),
            transaction: Some(record),
            ..Self::new(EventStatus::Alert, message)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventStatus::Error, message)
    }

    pub fn finished_checking(message: impl Into<String>) -> Self {
        Self::new(EventStatus::FinishedChecking, message)
    }
}
