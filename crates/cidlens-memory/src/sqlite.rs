use std::path::Path;
use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::error::MemoryError;
use crate::repository::CodeRepository;
use crate::types::{ClassificationRecord, UpsertOutcome};

type RecordRow = (String, String, bool, Option<String>, Option<String>);

/// `SQLite`-backed repository. Embeddings are stored as JSON arrays.
#[derive(Debug, Clone)]
pub struct SqliteCodeRepository {
    pool: SqlitePool,
}

impl SqliteCodeRepository {
    /// Open (or create) the `SQLite` database and run migrations.
    ///
    /// `":memory:"` opens a private in-memory database on a single
    /// connection; any other path is opened in WAL mode, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let pool = if path == ":memory:" {
            let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(opts)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await?;
            }
            let opts = SqliteConnectOptions::from_str(&format!("sqlite:{path}?mode=rwc"))?
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(opts)
                .await?
        };

        sqlx::migrate!("../../migrations").run(&pool).await?;
        tracing::debug!(path, "code repository opened");

        Ok(Self { pool })
    }

    /// Expose the underlying pool for shared access.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_record(row: RecordRow) -> Result<ClassificationRecord, MemoryError> {
    let (code, description, eligible, legal_notes, embedding) = row;
    let embedding = embedding
        .as_deref()
        .map(serde_json::from_str::<Vec<f32>>)
        .transpose()?;
    Ok(ClassificationRecord {
        code,
        description,
        eligible,
        legal_notes,
        embedding,
    })
}

impl CodeRepository for SqliteCodeRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<ClassificationRecord>, MemoryError> {
        let row: Option<RecordRow> = sqlx::query_as(
            "SELECT code, description, eligible, legal_notes, embedding \
             FROM classification_codes WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_record).transpose()
    }

    async fn all_with_embedding(&self) -> Result<Vec<ClassificationRecord>, MemoryError> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT code, description, eligible, legal_notes, embedding \
             FROM classification_codes WHERE embedding IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let code = row.0.clone();
            match row_to_record(row) {
                Ok(record) if record.has_embedding() => records.push(record),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(code = %code, "skipping record with undecodable embedding: {e}");
                }
            }
        }
        Ok(records)
    }

    async fn upsert(&self, record: ClassificationRecord) -> Result<UpsertOutcome, MemoryError> {
        record.validate()?;
        let embedding = record
            .embedding
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM classification_codes WHERE code = ?")
                .bind(&record.code)
                .fetch_optional(&mut *tx)
                .await?;

        sqlx::query(
            "INSERT INTO classification_codes (code, description, eligible, legal_notes, embedding) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(code) DO UPDATE SET \
                 description = excluded.description, \
                 eligible = excluded.eligible, \
                 legal_notes = excluded.legal_notes, \
                 embedding = excluded.embedding, \
                 updated_at = datetime('now')",
        )
        .bind(&record.code)
        .bind(&record.description)
        .bind(record.eligible)
        .bind(&record.legal_notes)
        .bind(embedding)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(if existing.is_some() {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    async fn count(&self) -> Result<u64, MemoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM classification_codes")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count)?)
    }

    async fn clear(&self) -> Result<u64, MemoryError> {
        let result = sqlx::query("DELETE FROM classification_codes")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
