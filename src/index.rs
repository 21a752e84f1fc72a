//! SQLite-backed vector index.
//!
//! Stores passages together with their embedding vectors (little-endian f32
//! BLOBs) and answers nearest-neighbor queries with a brute-force cosine scan.
//! The SQLite file is the durable form of the index: reopening the same path
//! reconstructs an equivalent index with identical search results.
//!
//! Write path guarantees:
//! - one ingestion batch = one transaction, so entries become searchable
//!   all at once or not at all;
//! - every stored vector is checked against the index dimensionality before
//!   the batch commits;
//! - writers serialize on SQLite's single-writer lock while readers keep
//!   seeing the last committed state (WAL journal mode).

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::debug;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::{PipelineError, Result};
use crate::models::{Document, Passage, ScoredPassage};

/// Counts reported by [`VectorIndex::stats`].
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub documents: i64,
    pub passages: i64,
    pub dims: usize,
}

/// A persistent store of (passage, vector) entries supporting top-k search.
#[derive(Debug)]
pub struct VectorIndex {
    pool: SqlitePool,
    dims: usize,
}

impl VectorIndex {
    /// Open the index at `path`, creating the file and schema when missing.
    ///
    /// `dims` is the embedding dimensionality the index accepts. It is
    /// recorded in the store on first use; reopening an existing store with
    /// a different dimensionality fails with
    /// [`PipelineError::DimensionMismatch`] rather than mixing incomparable
    /// vectors.
    pub async fn open(path: &Path, dims: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        run_migrations(&pool).await?;

        let index = Self { pool, dims };
        index.check_stored_dims().await?;
        Ok(index)
    }

    /// Dimensionality this index accepts.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Add one ingested document and its passages in a single transaction.
    ///
    /// All-or-nothing: a dimension mismatch or storage failure anywhere in
    /// the batch rolls back every row, including the document itself, so a
    /// failed ingestion leaves the index exactly as it was.
    pub async fn upsert(
        &self,
        document: &Document,
        passages: &[Passage],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        if passages.len() != vectors.len() {
            return Err(PipelineError::BatchMismatch {
                passages: passages.len(),
                vectors: vectors.len(),
            });
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO documents (id, source, page_count, ingested_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&document.id)
        .bind(&document.source)
        .bind(document.page_count)
        .bind(document.ingested_at)
        .execute(&mut *tx)
        .await?;

        for (passage, vector) in passages.iter().zip(vectors.iter()) {
            // Checked inside the transaction: a bad vector anywhere in the
            // batch rolls back everything inserted before it.
            if vector.len() != self.dims {
                return Err(PipelineError::DimensionMismatch {
                    expected: self.dims,
                    actual: vector.len(),
                });
            }

            sqlx::query(
                r#"
                INSERT INTO passages
                    (id, document_id, seq, text, page_start, page_end,
                     char_start, char_end, hash, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&passage.id)
            .bind(&passage.document_id)
            .bind(passage.seq)
            .bind(&passage.text)
            .bind(passage.page_start)
            .bind(passage.page_end)
            .bind(passage.char_start)
            .bind(passage.char_end)
            .bind(&passage.hash)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(
            document = %document.id,
            passages = passages.len(),
            "committed ingestion batch"
        );
        Ok(())
    }

    /// Return up to `k` passages ranked by descending cosine similarity.
    ///
    /// Ties keep insertion order (earlier-inserted first): rows are scanned
    /// in rowid order — rows are never deleted, so rowid is insertion
    /// order — and the sort is stable. An empty index yields an empty
    /// result, never an error.
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPassage>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        if self.dims > 0 && query.len() != self.dims {
            return Err(PipelineError::DimensionMismatch {
                expected: self.dims,
                actual: query.len(),
            });
        }

        let rows = sqlx::query(
            r#"
            SELECT id, document_id, seq, text, page_start, page_end,
                   char_start, char_end, hash, embedding
            FROM passages
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let blob: Vec<u8> = row.get("embedding");
            let vector = blob_to_vec(&blob);
            let score = cosine_similarity(query, &vector);
            scored.push(ScoredPassage {
                passage: Passage {
                    id: row.get("id"),
                    document_id: row.get("document_id"),
                    seq: row.get("seq"),
                    text: row.get("text"),
                    page_start: row.get("page_start"),
                    page_end: row.get("page_end"),
                    char_start: row.get("char_start"),
                    char_end: row.get("char_end"),
                    hash: row.get("hash"),
                },
                score,
            });
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    /// Number of stored passages.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Document and passage counts.
    pub async fn stats(&self) -> Result<IndexStats> {
        let documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        let passages: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passages")
            .fetch_one(&self.pool)
            .await?;
        Ok(IndexStats {
            documents,
            passages,
            dims: self.dims,
        })
    }

    /// Record the dimensionality on first use; reject a mismatch afterwards.
    async fn check_stored_dims(&self) -> Result<()> {
        if self.dims == 0 {
            return Ok(());
        }

        sqlx::query("INSERT OR IGNORE INTO index_meta (key, value) VALUES ('dims', ?)")
            .bind(self.dims.to_string())
            .execute(&self.pool)
            .await?;

        let stored: String = sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'dims'")
            .fetch_one(&self.pool)
            .await?;
        let stored: usize = stored.parse().map_err(|_| {
            PipelineError::Config(format!("corrupt dims entry in index metadata: {}", stored))
        })?;

        if stored != self.dims {
            return Err(PipelineError::DimensionMismatch {
                expected: stored,
                actual: self.dims,
            });
        }
        Ok(())
    }
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            page_count INTEGER NOT NULL,
            ingested_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS passages (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            seq INTEGER NOT NULL,
            text TEXT NOT NULL,
            page_start INTEGER NOT NULL,
            page_end INTEGER NOT NULL,
            char_start INTEGER NOT NULL,
            char_end INTEGER NOT NULL,
            hash TEXT NOT NULL,
            embedding BLOB NOT NULL,
            UNIQUE(document_id, seq),
            FOREIGN KEY (document_id) REFERENCES documents(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_passages_document_id ON passages(document_id)")
        .execute(pool)
        .await?;

    Ok(())
}
