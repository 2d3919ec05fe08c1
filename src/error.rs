use thiserror::Error;

/// Destination-side failure. Fatal for the run: the loader never retries,
/// and batches appended before the failure stay committed.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("destination unavailable: {0}")]
    Unavailable(String),
}

/// Everything `load` can fail with. Per-row date coercion failures are not
/// here: they are recovered locally as a null timestamp.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source header is missing a required column. Detected before any
    /// row is appended.
    #[error("source is missing required column \"{0}\"")]
    Schema(String),

    #[error(transparent)]
    Sink(#[from] SinkError),

    /// I/O or CSV framing error while reading the source.
    #[error("reading source: {0}")]
    Source(#[from] csv::Error),
}
