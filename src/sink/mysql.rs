use async_trait::async_trait;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use tracing::debug;

use crate::config::Config;
use crate::error::SinkError;
use crate::ingest::record::ServiceRequest;
use crate::sink::RequestSink;

/// The sink creates the table on connect if it does not exist; it never
/// alters an existing schema.
const CREATE_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS service_requests (
    created_date DATETIME NULL,
    agency TEXT,
    agency_name TEXT,
    complaint_type TEXT,
    descriptor TEXT,
    incident_zip TEXT,
    borough TEXT,
    resolution_description TEXT
)";

const INSERT_PREFIX: &str = "\
INSERT INTO service_requests (created_date, agency, agency_name, complaint_type, \
descriptor, incident_zip, borough, resolution_description) ";

/// Rows per INSERT statement. 8 binds per row keeps a statement well under
/// MySQL's 65535-placeholder limit even at the default chunk size.
const INSERT_CHUNK_ROWS: usize = 5_000;

/// MySQL-backed append-only sink for `service_requests`.
pub struct MySqlSink {
    pool: MySqlPool,
}

impl MySqlSink {
    /// Open the write-phase connection and ensure the destination table
    /// exists. The single-connection pool is the run's one writer.
    pub async fn connect(cfg: &Config) -> Result<Self, SinkError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect(&cfg.database_url())
            .await?;
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Release the write-phase connection. Call before any reporting reads
    /// acquire their own.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl RequestSink for MySqlSink {
    /// Append one batch inside a single transaction: the batch is the unit
    /// of durability, so a mid-batch failure commits nothing from it while
    /// earlier batches stay committed.
    async fn append(&mut self, rows: &[ServiceRequest]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            let mut builder = QueryBuilder::<MySql>::new(INSERT_PREFIX);
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.created_date)
                    .push_bind(row.agency.as_str())
                    .push_bind(row.agency_name.as_str())
                    .push_bind(row.complaint_type.as_str())
                    .push_bind(row.descriptor.as_str())
                    .push_bind(row.incident_zip.as_str())
                    .push_bind(row.borough.as_str())
                    .push_bind(row.resolution_description.as_str());
            });
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!(rows = rows.len(), "appended batch");
        Ok(())
    }
}
