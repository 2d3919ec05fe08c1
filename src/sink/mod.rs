pub mod mysql;

use async_trait::async_trait;

use crate::error::SinkError;
use crate::ingest::record::ServiceRequest;

pub use mysql::MySqlSink;

/// Append-only destination for projected rows. One writer for the duration
/// of a run; a rejected append is fatal to the caller and is never retried.
#[async_trait]
pub trait RequestSink: Send {
    async fn append(&mut self, rows: &[ServiceRequest]) -> Result<(), SinkError>;
}
