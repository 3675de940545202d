//! Batch ingestion of the CID-10 table: CSV rows → canonical records →
//! embeddings → repository.

use std::io::Read;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use regex::Regex;

use cidlens_llm::EmbeddingProvider;
use cidlens_memory::code::canonicalize;
use cidlens_memory::{ClassificationRecord, CodeRepository, UpsertOutcome};

use crate::error::{IngestError, Result};

static CODE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*-\s*").expect("code separator pattern is valid"));

/// Ingestion configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub code_column: String,
    pub description_column: String,
    /// Optional eligibility column; rows default to not eligible without it.
    pub eligibility_column: Option<String>,
    /// Store records without computing embeddings.
    pub skip_embeddings: bool,
    /// Remove every existing record before loading.
    pub fresh: bool,
    /// Stop after this many records have been written.
    pub limit: Option<usize>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            code_column: "CODE".into(),
            description_column: "DESC".into(),
            eligibility_column: Some("BPC".into()),
            skip_embeddings: false,
            fresh: false,
            limit: None,
        }
    }
}

/// Summary of an ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub rows_read: usize,
    /// Rows dropped for a blank code or description.
    pub rows_skipped: usize,
    pub records_inserted: usize,
    pub records_updated: usize,
    /// Records stored without an embedding because the provider failed.
    pub embeddings_missing: usize,
    pub records_cleared: u64,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl IngestReport {
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_inserted + self.records_updated
    }
}

struct SourceRow {
    line: u64,
    codes: String,
    description: String,
    eligible: bool,
}

struct Columns {
    code: usize,
    description: usize,
    eligibility: Option<usize>,
}

/// Loads the source table into a [`CodeRepository`], embedding each record.
///
/// A cell may list several codes separated by dashes (`S38 - S38.9`); each
/// becomes its own record sharing the row's description and eligibility.
/// Per-row failures are collected in the report and never abort the run.
pub struct IngestionPipeline<R, P> {
    repository: Arc<R>,
    provider: Arc<P>,
    config: IngestConfig,
}

impl<R: CodeRepository, P: EmbeddingProvider> IngestionPipeline<R, P> {
    #[must_use]
    pub fn new(repository: Arc<R>, provider: Arc<P>, config: IngestConfig) -> Self {
        Self {
            repository,
            provider,
            config,
        }
    }

    /// Ingest the CSV file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the header lacks a
    /// required column, or a fresh load cannot clear the repository.
    pub async fn ingest_path(&self, path: &Path) -> Result<IngestReport> {
        let bytes = tokio::fs::read(path).await?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "reading classification table");
        self.ingest_reader(bytes.as_slice()).await
    }

    /// Ingest CSV data from `reader`.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be read or lacks a required
    /// column, or a fresh load cannot clear the repository.
    pub async fn ingest_reader<Rd: Read>(&self, reader: Rd) -> Result<IngestReport> {
        let start = Instant::now();
        let mut report = IngestReport::default();
        let rows = self.read_rows(reader)?;

        if self.config.fresh {
            report.records_cleared = self.repository.clear().await?;
            tracing::info!(removed = report.records_cleared, "repository cleared");
        }

        let total = rows.len();
        tracing::info!(total, skip_embeddings = self.config.skip_embeddings, "ingestion started");

        'rows: for row in rows {
            report.rows_read += 1;
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!("{e}");
                    report.errors.push(e);
                    continue;
                }
            };

            if row.codes.is_empty() || row.description.is_empty() {
                tracing::debug!(line = row.line, "row without code or description skipped");
                report.rows_skipped += 1;
                continue;
            }

            for fragment in split_codes(&row.codes) {
                if self
                    .config
                    .limit
                    .is_some_and(|limit| report.records_written() >= limit)
                {
                    tracing::info!(limit = self.config.limit, "record limit reached");
                    break 'rows;
                }

                let Some(code) = canonicalize(fragment) else {
                    let message = format!("line {}: {fragment:?} is not a CID-10 code", row.line);
                    tracing::warn!("{message}");
                    report.errors.push(message);
                    continue;
                };

                let mut record =
                    ClassificationRecord::new(code, row.description.clone(), row.eligible);
                if !self.config.skip_embeddings {
                    match self.provider.embed(&embedding_text(&record)).await {
                        Ok(vector) => record.embedding = Some(vector),
                        Err(e) => {
                            tracing::warn!(code = %record.code, "embedding failed, storing without one: {e}");
                            report.embeddings_missing += 1;
                        }
                    }
                }

                let code = record.code.clone();
                match self.repository.upsert(record).await {
                    Ok(UpsertOutcome::Inserted) => report.records_inserted += 1,
                    Ok(UpsertOutcome::Updated) => report.records_updated += 1,
                    Err(e) => {
                        let message = format!("line {}: {code}: {e}", row.line);
                        tracing::warn!("{message}");
                        report.errors.push(message);
                    }
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(
            rows = report.rows_read,
            inserted = report.records_inserted,
            updated = report.records_updated,
            skipped = report.rows_skipped,
            embeddings_missing = report.embeddings_missing,
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "ingestion complete"
        );
        Ok(report)
    }

    fn read_rows<Rd: Read>(&self, reader: Rd) -> Result<Vec<std::result::Result<SourceRow, String>>> {
        let mut csv = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns = self.resolve_columns(csv.headers()?)?;

        Ok(csv
            .records()
            .map(|record| -> std::result::Result<SourceRow, String> {
                let record = record.map_err(|e| {
                    let line = e.position().map_or(0, csv::Position::line);
                    format!("line {line}: {e}")
                })?;
                let field = |idx: usize| record.get(idx).unwrap_or_default().to_owned();
                Ok(SourceRow {
                    line: record.position().map_or(0, csv::Position::line),
                    codes: field(columns.code),
                    description: field(columns.description),
                    eligible: columns
                        .eligibility
                        .and_then(|idx| record.get(idx))
                        .is_some_and(parse_flag),
                })
            })
            .collect())
    }

    fn resolve_columns(&self, headers: &csv::StringRecord) -> Result<Columns> {
        let find = |name: &str| {
            headers.iter().position(|h| {
                h.trim_start_matches('\u{feff}')
                    .trim()
                    .eq_ignore_ascii_case(name)
            })
        };
        let required =
            |name: &str| find(name).ok_or_else(|| IngestError::MissingColumn(name.to_owned()));

        let columns = Columns {
            code: required(&self.config.code_column)?,
            description: required(&self.config.description_column)?,
            eligibility: self.config.eligibility_column.as_deref().and_then(find),
        };
        if columns.eligibility.is_none()
            && let Some(name) = &self.config.eligibility_column
        {
            tracing::debug!(column = %name, "eligibility column absent; all rows not eligible");
        }
        Ok(columns)
    }
}

/// Split a code cell on dashes into its trimmed, non-empty fragments.
#[must_use]
pub fn split_codes(cell: &str) -> Vec<&str> {
    CODE_SEPARATOR
        .split(cell)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// `1`, `true`, `yes` and `on` (any case) are true; everything else is false.
#[must_use]
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Text embedded for a record.
#[must_use]
pub fn embedding_text(record: &ClassificationRecord) -> String {
    format!(
        "CID-10 {}: {} - bpc_eligibility: {}",
        record.code, record.description, record.eligible
    )
}
