use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Source listings ---

/// One candidate filing found on the disclosure search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingDescriptor {
    /// Numeric document id taken from the document URL. Higher is newer.
    pub id: u64,
    pub name: String,
    pub office: String,
    pub filing_year: i32,
    pub document_url: String,
}

// --- Extracted records ---
//
// Field names follow the payload shape the extraction model is asked to
// produce, so the same types serve for parsing, storage, and the event stream.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FilingInfo {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Status")]
    pub status: String,
    /// Office as printed on the filing, e.g. "CA05".
    #[serde(rename = "State_District")]
    pub state_district: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TransactionEntry {
    /// Owner code: SP (spouse), DC (dependent child), JT (joint), or empty for self.
    #[serde(rename = "ID_Owner", default)]
    pub owner_id: String,
    #[serde(rename = "Asset")]
    pub asset: String,
    /// P (purchase), S (sale), S (partial), or E (exchange).
    #[serde(rename = "Transaction_Type")]
    pub transaction_type: String,
    #[serde(rename = "Date")]
    pub date: String,
    /// Amount range as printed, e.g. "$1,001 - $15,000".
    #[serde(rename = "Amount")]
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedRecord {
    #[serde(rename = "Filing_Information")]
    pub filing_information: FilingInfo,
    #[serde(rename = "Transactions")]
    pub transactions: Vec<TransactionEntry>,
}

impl ExtractedRecord {
    pub fn has_transactions(&self) -> bool {
        !self.transactions.is_empty()
    }

    /// Clean up model output: amounts get a leading `$` and no line breaks,
    /// assets lose control characters and collapse whitespace.
    pub fn normalized(mut self) -> Self {
        for tx in &mut self.transactions {
            tx.amount = normalize_amount(&tx.amount);
            tx.asset = normalize_asset(&tx.asset);
        }
        self
    }
}

/// Replace control characters (line breaks included) with spaces and
/// collapse runs of whitespace.
fn collapse_whitespace(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_amount(raw: &str) -> String {
    let cleaned = collapse_whitespace(raw);
    if cleaned.is_empty() || cleaned.starts_with('$') {
        cleaned
    } else {
        format!("${cleaned}")
    }
}

pub fn normalize_asset(raw: &str) -> String {
    collapse_whitespace(raw)
}

// --- Validation ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted,
    AcceptedWithWarning(String),
    Rejected(String),
}

// --- Persistence ---

/// A filing accepted by validation, ready to be appended to the store.
#[derive(Debug, Clone)]
pub struct NewFiling {
    pub document_url: String,
    pub name: String,
    pub office: String,
    pub record: ExtractedRecord,
    pub warning: Option<String>,
}

/// A persisted filing as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFiling {
    pub id: Uuid,
    pub document_url: String,
    pub name: String,
    pub office: String,
    pub record: ExtractedRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub created_at: DateTime<Utc>,
}
