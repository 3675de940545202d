//! Error types for cidlens-index.

/// Fatal ingestion failures. Per-row problems are recorded in the
/// [`IngestReport`](crate::ingest::IngestReport) instead.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// IO error reading the source table.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV header could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the header row.
    #[error("missing required column {0:?}")]
    MissingColumn(String),

    /// The repository refused a bulk operation (e.g. clearing before a fresh load).
    #[error("storage error: {0}")]
    Storage(#[from] cidlens_memory::MemoryError),
}

/// Result type alias using `IngestError`.
pub type Result<T> = std::result::Result<T, IngestError>;
