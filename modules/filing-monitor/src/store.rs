// Postgres persistence for accepted filings.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use filing_common::{ExtractedRecord, FilingError, NewFiling, StoredFiling};

use crate::traits::FilingStore;

const MAX_CONNECTIONS: u32 = 5;

/// A row from the filings table.
#[derive(Debug, sqlx::FromRow)]
struct FilingRow {
    id: Uuid,
    document_url: String,
    name: String,
    office: String,
    record: Json<ExtractedRecord>,
    warning: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<FilingRow> for StoredFiling {
    fn from(row: FilingRow) -> Self {
        Self {
            id: row.id,
            document_url: row.document_url,
            name: row.name,
            office: row.office,
            record: row.record.0,
            warning: row.warning,
            created_at: row.created_at,
        }
    }
}

fn db_error(e: impl std::fmt::Display) -> FilingError {
    FilingError::Database(e.to_string())
}

pub struct PgFilingStore {
    pool: PgPool,
}

impl PgFilingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(db_error)?;
        Ok(Self::new(pool))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(db_error)?;
        info!("Filing store migrations applied");
        Ok(())
    }
}

#[async_trait]
impl FilingStore for PgFilingStore {
    async fn store(&self, filing: NewFiling) -> Result<StoredFiling> {
        let row = sqlx::query_as::<_, FilingRow>(
            r#"
            INSERT INTO filings (id, document_url, name, office, record, warning)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, document_url, name, office, record, warning, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&filing.document_url)
        .bind(&filing.name)
        .bind(&filing.office)
        .bind(Json(&filing.record))
        .bind(&filing.warning)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.into())
    }

    async fn fetch_latest(&self) -> Result<Option<StoredFiling>> {
        let row = sqlx::query_as::<_, FilingRow>(
            r#"
            SELECT id, document_url, name, office, record, warning, created_at
            FROM filings
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(StoredFiling::from))
    }
}
