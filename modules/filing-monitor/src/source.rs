//! House Clerk financial-disclosure search, narrowed to periodic
//! transaction reports.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use url::Url;

use filing_common::{FilingDescriptor, FilingError};

use crate::traits::FilingSource;

const SEARCH_PATH: &str = "FinancialDisclosure/ViewMemberSearchResult";

pub struct ClerkSource {
    http: reqwest::Client,
    base_url: Url,
}

impl ClerkSource {
    pub fn new(base_url: &str) -> Result<Self> {
        // A trailing slash makes `join` append instead of replacing the last segment.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| anyhow!("Invalid disclosure base URL {base_url}: {e}"))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }
}

#[async_trait]
impl FilingSource for ClerkSource {
    async fn fetch_filings(&self, year: i32) -> Result<Vec<FilingDescriptor>> {
        let url = self.base_url.join(SEARCH_PATH)?;
        let year_field = year.to_string();

        debug!(%url, year, "Searching disclosure filings");

        let html = self
            .http
            .post(url)
            .form(&[
                ("LastName", ""),
                ("FilingYear", year_field.as_str()),
                ("State", ""),
                ("District", ""),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let filings = parse_search_results(&html, &self.base_url, year)?;
        info!(
            year,
            count = filings.len(),
            latest_id = filings.first().map(|f| f.id),
            "Fetched transaction filings"
        );
        Ok(filings)
    }
}

fn selector(css: &str) -> Result<Selector, FilingError> {
    Selector::parse(css).map_err(|e| FilingError::Scraping(format!("bad selector {css}: {e}")))
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Numeric document id: the file stem of the URL's last path segment.
pub fn document_id(url: &Url) -> Option<u64> {
    let segment = url.path_segments()?.next_back()?;
    let stem = segment.split('.').next()?;
    stem.parse().ok()
}

fn is_transaction_report(filing_type: &str, document_url: &Url) -> bool {
    filing_type.to_ascii_uppercase().contains("PTR") || document_url.path().contains("/ptr-pdfs/")
}

/// Parse the search results table into descriptors, newest first.
///
/// Rows are `name (linked) | office | filing year | filing type`. Rows that are
/// not periodic transaction reports, or whose link carries no numeric id, are
/// skipped.
pub fn parse_search_results(
    html: &str,
    base_url: &Url,
    default_year: i32,
) -> Result<Vec<FilingDescriptor>, FilingError> {
    let document = Html::parse_document(html);
    let row_selector = selector("table tbody tr")?;
    let cell_selector = selector("td")?;
    let link_selector = selector("a[href]")?;

    let mut filings = Vec::new();

    for row in document.select(&row_selector) {
        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
        if cells.len() < 4 {
            continue;
        }

        let Some(href) = cells[0]
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };

        let Ok(document_url) = base_url.join(href.trim()) else {
            debug!(href, "Skipping row with unparseable link");
            continue;
        };

        let filing_type = cell_text(&cells[3]);
        if !is_transaction_report(&filing_type, &document_url) {
            continue;
        }

        let Some(id) = document_id(&document_url) else {
            debug!(%document_url, "Skipping row without numeric document id");
            continue;
        };

        filings.push(FilingDescriptor {
            id,
            name: cell_text(&cells[0]),
            office: cell_text(&cells[1]),
            filing_year: cell_text(&cells[2]).parse().unwrap_or(default_year),
            document_url: document_url.to_string(),
        });
    }

    filings.sort_by(|a, b| b.id.cmp(&a.id));
    Ok(filings)
}
