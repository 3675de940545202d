//! Hybrid CID-10 retrieval: direct code mentions plus embedding similarity.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use cidlens_llm::EmbeddingProvider;
use cidlens_memory::code::find_code_mention;
use cidlens_memory::{ClassificationRecord, CodeRepository, cosine_similarity};

/// Similarity assigned to a record matched by an explicit code mention.
pub const DIRECT_MATCH_SIMILARITY: f32 = 1.0;

/// How a result entered the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// The query named the code explicitly.
    DirectMention,
    /// Found by cosine similarity against the query embedding.
    Semantic,
}

/// A scored classification record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub code: String,
    pub description: String,
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_notes: Option<String>,
    pub similarity: f32,
    pub provenance: Provenance,
}

impl RetrievalResult {
    fn from_record(record: ClassificationRecord, similarity: f32, provenance: Provenance) -> Self {
        Self {
            code: record.code,
            description: record.description,
            eligible: record.eligible,
            legal_notes: record.legal_notes,
            similarity,
            provenance,
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalConfig {
    /// Maximum number of results returned.
    pub top_k: usize,
    /// Minimum cosine similarity a semantic hit must reach.
    pub min_similarity: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_similarity: 0.5,
        }
    }
}

/// Answers "which codes are relevant to this text?".
///
/// Searches never fail: storage and embedding errors are logged and the
/// affected pass contributes nothing.
pub struct RetrievalEngine<R, P> {
    repository: Arc<R>,
    provider: Arc<P>,
    config: RetrievalConfig,
}

impl<R: CodeRepository, P: EmbeddingProvider> RetrievalEngine<R, P> {
    #[must_use]
    pub fn new(repository: Arc<R>, provider: Arc<P>, config: RetrievalConfig) -> Self {
        Self {
            repository,
            provider,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> RetrievalConfig {
        self.config
    }

    /// Search with the configured `top_k` and `min_similarity`.
    pub async fn search(&self, query: &str) -> Vec<RetrievalResult> {
        self.search_with(query, self.config.top_k, self.config.min_similarity)
            .await
    }

    /// Search with explicit limits.
    ///
    /// Results are ordered by descending similarity, then direct mentions
    /// before semantic hits, then ascending code. No code appears twice and
    /// at most `top_k` results are returned.
    pub async fn search_with(
        &self,
        query: &str,
        top_k: usize,
        min_similarity: f32,
    ) -> Vec<RetrievalResult> {
        if top_k == 0 || query.trim().is_empty() {
            return Vec::new();
        }

        let mut results: Vec<RetrievalResult> = self.direct_mention(query).await.into_iter().collect();
        let semantic_limit = if results.is_empty() {
            top_k
        } else {
            top_k.saturating_sub(1).max(1)
        };

        let Some(query_vector) = self.provider.embed_or_none(query).await else {
            tracing::debug!(direct = results.len(), "semantic pass skipped");
            return results;
        };

        let semantic = self
            .semantic_pass(&query_vector, semantic_limit, min_similarity)
            .await;
        let seen: HashSet<String> = results.iter().map(|r| r.code.clone()).collect();
        results.extend(semantic.into_iter().filter(|r| !seen.contains(&r.code)));

        results.sort_by(rank_order);
        results.truncate(top_k);

        tracing::debug!(
            results = results.len(),
            direct = results
                .iter()
                .filter(|r| r.provenance == Provenance::DirectMention)
                .count(),
            "search complete"
        );
        results
    }

    async fn direct_mention(&self, query: &str) -> Option<RetrievalResult> {
        let code = find_code_mention(query)?;
        match self.repository.find_by_code(&code).await {
            Ok(Some(record)) if record.has_embedding() => Some(RetrievalResult::from_record(
                record,
                DIRECT_MATCH_SIMILARITY,
                Provenance::DirectMention,
            )),
            Ok(Some(_)) => {
                tracing::debug!(%code, "mentioned code has no embedding yet");
                None
            }
            Ok(None) => {
                tracing::debug!(%code, "mentioned code not in repository");
                None
            }
            Err(e) => {
                tracing::warn!(%code, "direct code lookup failed: {e}");
                None
            }
        }
    }

    async fn semantic_pass(
        &self,
        query_vector: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Vec<RetrievalResult> {
        let records = match self.repository.all_with_embedding().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("semantic scan failed: {e}");
                return Vec::new();
            }
        };

        let mut mismatched = 0usize;
        let mut scored: Vec<RetrievalResult> = records
            .into_iter()
            .filter_map(|record| {
                let embedding = record.embedding()?;
                if embedding.len() != query_vector.len() {
                    mismatched += 1;
                }
                let similarity = cosine_similarity(query_vector, embedding);
                (similarity >= min_similarity).then(|| {
                    RetrievalResult::from_record(record, similarity, Provenance::Semantic)
                })
            })
            .collect();

        if mismatched > 0 {
            tracing::warn!(
                mismatched,
                expected = query_vector.len(),
                "stored embeddings with a different dimensionality scored as 0.0"
            );
        }

        scored.sort_by(rank_order);
        scored.truncate(limit);
        scored
    }
}

fn rank_order(a: &RetrievalResult, b: &RetrievalResult) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then_with(|| a.provenance.cmp(&b.provenance))
        .then_with(|| a.code.cmp(&b.code))
}
