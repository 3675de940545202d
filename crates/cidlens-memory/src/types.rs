use serde::{Deserialize, Serialize};

use crate::code::is_canonical;
use crate::error::MemoryError;

/// One CID-10 code with its description, BPC/LOAS eligibility, and the
/// embedding used for semantic search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub code: String,
    pub description: String,
    pub eligible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl ClassificationRecord {
    #[must_use]
    pub fn new(code: impl Into<String>, description: impl Into<String>, eligible: bool) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            eligible,
            legal_notes: None,
            embedding: None,
        }
    }

    #[must_use]
    pub fn with_legal_notes(mut self, notes: impl Into<String>) -> Self {
        self.legal_notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// The stored embedding, if any non-empty one is present.
    #[must_use]
    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref().filter(|e| !e.is_empty())
    }

    #[must_use]
    pub fn has_embedding(&self) -> bool {
        self.embedding().is_some()
    }

    /// Check the invariants every stored record must hold.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidRecord`] for a non-canonical code, a blank
    /// description, or an embedding containing non-finite values.
    pub fn validate(&self) -> Result<(), MemoryError> {
        let invalid = |reason| MemoryError::InvalidRecord {
            code: self.code.clone(),
            reason,
        };
        if !is_canonical(&self.code) {
            return Err(invalid("code is not in canonical form"));
        }
        if self.description.trim().is_empty() {
            return Err(invalid("description is empty"));
        }
        if self
            .embedding
            .as_ref()
            .is_some_and(|e| e.iter().any(|v| !v.is_finite()))
        {
            return Err(invalid("embedding contains non-finite values"));
        }
        Ok(())
    }
}

/// Whether an upsert created a new record or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}
