use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::MemoryError;
use crate::repository::CodeRepository;
use crate::types::{ClassificationRecord, UpsertOutcome};

/// Process-local repository backed by a `RwLock<HashMap>`.
pub struct InMemoryCodeRepository {
    records: RwLock<HashMap<String, ClassificationRecord>>,
}

impl InMemoryCodeRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCodeRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryCodeRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCodeRepository")
            .finish_non_exhaustive()
    }
}

impl CodeRepository for InMemoryCodeRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<ClassificationRecord>, MemoryError> {
        let records = self
            .records
            .read()
            .map_err(|e| MemoryError::Other(e.to_string()))?;
        Ok(records.get(code).cloned())
    }

    async fn all_with_embedding(&self) -> Result<Vec<ClassificationRecord>, MemoryError> {
        let records = self
            .records
            .read()
            .map_err(|e| MemoryError::Other(e.to_string()))?;
        Ok(records
            .values()
            .filter(|r| r.has_embedding())
            .cloned()
            .collect())
    }

    async fn upsert(&self, record: ClassificationRecord) -> Result<UpsertOutcome, MemoryError> {
        record.validate()?;
        let mut records = self
            .records
            .write()
            .map_err(|e| MemoryError::Other(e.to_string()))?;
        match records.insert(record.code.clone(), record) {
            Some(_) => Ok(UpsertOutcome::Updated),
            None => Ok(UpsertOutcome::Inserted),
        }
    }

    async fn count(&self) -> Result<u64, MemoryError> {
        let records = self
            .records
            .read()
            .map_err(|e| MemoryError::Other(e.to_string()))?;
        Ok(u64::try_from(records.len())?)
    }

    async fn clear(&self) -> Result<u64, MemoryError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| MemoryError::Other(e.to_string()))?;
        let removed = u64::try_from(records.len())?;
        records.clear();
        Ok(removed)
    }
}
