use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilingError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Scraping error: {0}")]
    Scraping(String),
}
