//! Turns a transaction-report PDF into an [`ExtractedRecord`] by handing the
//! document to Claude and parsing the JSON it returns.

use ai_client::{extract_fenced_block, truncate_to_char_boundary, Claude};
use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use filing_common::{ExtractedRecord, FilingError};

use crate::traits::DocumentExtractor;

const PDF_MEDIA_TYPE: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF";

const SYSTEM_PROMPT: &str = "You transcribe U.S. House periodic transaction reports into \
structured JSON. Copy values exactly as printed. Never invent transactions that are not on \
the document. Respond with JSON only.";

/// Instructions plus the JSON schema the reply must follow.
pub fn extraction_prompt() -> String {
    let schema = schemars::schema_for!(ExtractedRecord);
    let schema_json = serde_json::to_string_pretty(&schema).unwrap_or_default();

    format!(
        "Read the attached periodic transaction report and return a single JSON object \
         matching this schema:\n\n{schema_json}\n\n\
         Rules:\n\
         - Filing_Information.Name is the filer's name as printed, including any honorific.\n\
         - Filing_Information.State_District is the state and district code, e.g. \"CA05\".\n\
         - Add one entry to Transactions for every row of the transactions table.\n\
         - ID_Owner is SP, DC or JT when printed, otherwise an empty string.\n\
         - Transaction_Type is P, S, S (partial) or E.\n\
         - Date is the transaction date as MM/DD/YYYY.\n\
         - Amount is the printed range, e.g. \"$1,001 - $15,000\"."
    )
}

pub struct ClaudeExtractor {
    claude: Claude,
    http: reqwest::Client,
}

impl ClaudeExtractor {
    pub fn new(claude: Claude) -> Self {
        Self {
            claude,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    async fn download(&self, document_url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(document_url)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        if !bytes.starts_with(PDF_MAGIC) {
            bail!("{document_url} is not a PDF ({} bytes)", bytes.len());
        }
        debug!(document_url, size = bytes.len(), "Downloaded filing document");
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl DocumentExtractor for ClaudeExtractor {
    async fn extract(&self, document_url: &str) -> Result<ExtractedRecord> {
        let bytes = self.download(document_url).await?;

        let text = self
            .claude
            .read_document(&bytes, PDF_MEDIA_TYPE, SYSTEM_PROMPT, &extraction_prompt())
            .await?;

        let record = parse_extraction_response(&text).map_err(|e| {
            warn!(
                document_url,
                response = truncate_to_char_boundary(&text, 300),
                "Unparseable extraction response"
            );
            e
        })?;

        info!(
            document_url,
            model = self.claude.model(),
            transactions = record.transactions.len(),
            "Extracted filing"
        );
        Ok(record)
    }
}

/// Outermost `{ ... }` span, for replies that wrap the JSON in prose.
fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a model reply into a normalized record.
///
/// Accepts a bare JSON object, a fenced code block, or an object embedded in
/// surrounding text. A fenced block that is not a record does not hide a valid
/// object elsewhere in the reply. A record with no transactions is an error.
pub fn parse_extraction_response(text: &str) -> Result<ExtractedRecord, FilingError> {
    let candidates = [extract_fenced_block(text), outer_object(text)];
    let mut last_error = None;

    for candidate in candidates.into_iter().flatten() {
        match serde_json::from_str::<ExtractedRecord>(candidate) {
            Ok(record) => {
                let record = record.normalized();
                if !record.has_transactions() {
                    return Err(FilingError::Extraction("record has no transactions".into()));
                }
                return Ok(record);
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(match last_error {
        Some(e) => FilingError::Extraction(format!("invalid record JSON: {e}")),
        None => FilingError::Extraction("response contains no JSON object".into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD_JSON: &str = r#"{
        "Filing_Information": {"Name": "Hon. Jane A. Doe", "Status": "Member", "State_District": "CA05"},
        "Transactions": [
            {"ID_Owner": "SP", "Asset": "NVIDIA Corporation\n(NVDA) [ST]", "Transaction_Type": "P",
             "Date": "01/16/2024", "Amount": "15,001 -\n$50,000"}
        ]
    }"#;

    #[test]
    fn parses_bare_json_and_normalizes() {
        let record = parse_extraction_response(RECORD_JSON).unwrap();

        assert_eq!(record.filing_information.name, "Hon. Jane A. Doe");
        assert_eq!(record.transactions.len(), 1);
        assert_eq!(record.transactions[0].asset, "NVIDIA Corporation (NVDA) [ST]");
        assert_eq!(record.transactions[0].amount, "$15,001 - $50,000");
    }

    #[test]
    fn parses_fenced_block() {
        let reply = format!("Here is the data:\n```json\n{RECORD_JSON}\n```\nLet me know.");
        let record = parse_extraction_response(&reply).unwrap();
        assert_eq!(record.filing_information.state_district, "CA05");
    }

    #[test]
    fn non_json_fence_does_not_hide_later_object() {
        let reply = format!("Notes:\n```\nPage 2 was blurry\n```\n{RECORD_JSON}");
        let record = parse_extraction_response(&reply).unwrap();
        assert_eq!(record.filing_information.name, "Hon. Jane A. Doe");
        assert_eq!(record.transactions.len(), 1);
    }

    #[test]
    fn fence_without_record_and_no_object_is_an_error() {
        let reply = "Notes:\n```\nPage 2 was blurry\n```\nNothing else to report.";
        let err = parse_extraction_response(reply).unwrap_err();
        assert!(matches!(err, FilingError::Extraction(ref m) if m.contains("invalid record JSON")));
    }

    #[test]
    fn parses_object_wrapped_in_prose() {
        let reply = format!("Sure. {RECORD_JSON} Hope that helps.");
        assert!(parse_extraction_response(&reply).is_ok());
    }

    #[test]
    fn owner_defaults_to_empty_when_missing() {
        let json = r#"{"Filing_Information": {"Name": "A B", "Status": "Member", "State_District": "TX12"},
            "Transactions": [{"Asset": "Apple Inc.", "Transaction_Type": "S", "Date": "02/01/2024", "Amount": "$1,001 - $15,000"}]}"#;
        let record = parse_extraction_response(json).unwrap();
        assert_eq!(record.transactions[0].owner_id, "");
    }

    #[test]
    fn empty_transactions_is_an_error() {
        let json = r#"{"Filing_Information": {"Name": "A B", "Status": "Member", "State_District": "TX12"}, "Transactions": []}"#;
        let err = parse_extraction_response(json).unwrap_err();
        assert!(matches!(err, FilingError::Extraction(ref m) if m.contains("no transactions")));
    }

    #[test]
    fn text_without_json_is_an_error() {
        let err = parse_extraction_response("I could not read this document.").unwrap_err();
        assert!(matches!(err, FilingError::Extraction(_)));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_extraction_response(r#"{"Filing_Information": "#).is_err());
        assert!(parse_extraction_response(r#"{"unexpected": true}"#).is_err());
    }

    #[test]
    fn prompt_embeds_record_schema() {
        let prompt = extraction_prompt();
        assert!(prompt.contains("Filing_Information"));
        assert!(prompt.contains("Transaction_Type"));
    }
}
