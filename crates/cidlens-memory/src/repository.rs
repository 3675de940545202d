use std::future::Future;

use crate::error::MemoryError;
use crate::types::{ClassificationRecord, UpsertOutcome};

/// Keyed storage of classification records with a scan over embedded ones.
///
/// Reads never mutate. `upsert` replaces the whole record keyed on `code`
/// and is atomic per record: readers see either the old or the new version.
pub trait CodeRepository: Send + Sync {
    /// Exact lookup by canonical code.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn find_by_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<ClassificationRecord>, MemoryError>> + Send;

    /// Every record with a non-empty embedding, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn all_with_embedding(
        &self,
    ) -> impl Future<Output = Result<Vec<ClassificationRecord>, MemoryError>> + Send;

    /// Insert or replace the record keyed on its code.
    ///
    /// # Errors
    ///
    /// Returns an error if the record fails validation or the write fails.
    fn upsert(
        &self,
        record: ClassificationRecord,
    ) -> impl Future<Output = Result<UpsertOutcome, MemoryError>> + Send;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn count(&self) -> impl Future<Output = Result<u64, MemoryError>> + Send;

    /// Remove every record, returning how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn clear(&self) -> impl Future<Output = Result<u64, MemoryError>> + Send;
}
