//! CID-10 classification records, their storage backends, and the vector
//! math used to score them.

pub mod code;
pub mod error;
pub mod in_memory_store;
pub mod math;
pub mod repository;
pub mod sqlite;
pub mod types;

pub use error::MemoryError;
pub use in_memory_store::InMemoryCodeRepository;
pub use math::cosine_similarity;
pub use repository::CodeRepository;
pub use sqlite::SqliteCodeRepository;
pub use types::{ClassificationRecord, UpsertOutcome};
