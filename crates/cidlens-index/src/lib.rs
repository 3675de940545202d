//! CID-10 ingestion, hybrid retrieval, and prompt context formatting.
//!
//! The ingestion pipeline turns the source table into embedded
//! [`ClassificationRecord`](cidlens_memory::ClassificationRecord)s; the
//! retrieval engine combines direct code mentions with cosine-similarity
//! search; the context formatter renders results as a prompt block.

pub mod context;
pub mod error;
pub mod ingest;
pub mod retriever;

pub use context::ContextFormatter;
pub use error::{IngestError, Result};
pub use ingest::{IngestConfig, IngestReport, IngestionPipeline};
pub use retriever::{Provenance, RetrievalConfig, RetrievalEngine, RetrievalResult};
