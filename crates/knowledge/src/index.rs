//! SQLite-backed vector index for collection chunks.

use crate::types::RetrievalResult;
use crate::vector_index::{IndexedChunk, VectorIndex};
use chrono::Utc;
use deepsearch_core::{AppError, AppResult};
use rusqlite::{params, Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Brute-force cosine similarity index stored in one SQLite file.
///
/// Queries run on the blocking thread pool so concurrent searches do not
/// stall the async runtime.
pub struct SqliteIndex {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

/// A loaded file as recorded in the `sources` table.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub reference: String,
    pub content_type: String,
    pub size_bytes: u64,
}

impl SqliteIndex {
    /// Open (creating if needed) the index database.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::VectorIndex(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::VectorIndex(format!("Failed to open SQLite index: {}", e)))?;

        init_schema(&conn)?;

        tracing::debug!("Opened SQLite index at {:?}", db_path);
        Ok(Self {
            path: db_path.to_path_buf(),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns (sources_count, chunks_count).
    pub fn stats(&self) -> AppResult<(u32, u32)> {
        count_rows(&*lock(&self.conn)?)
    }

    /// Replace everything stored for one source in a single transaction.
    ///
    /// Chunks from an earlier load of the same reference are removed first,
    /// so a file that shrank leaves no stale positions behind.
    pub async fn replace_source(
        &self,
        source: SourceRecord,
        chunks: Vec<IndexedChunk>,
    ) -> AppResult<usize> {
        self.run(move |conn| {
            let tx = conn.transaction().map_err(|e| {
                AppError::VectorIndex(format!("Failed to begin transaction: {}", e))
            })?;
            delete_reference_in(&tx, &source.reference)?;
            let written = insert_chunks(&tx, &chunks)?;
            tx.execute(
                "INSERT OR REPLACE INTO sources (reference, content_type, loaded_at, size_bytes)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    source.reference,
                    source.content_type,
                    Utc::now().to_rfc3339(),
                    source.size_bytes as i64
                ],
            )
            .map_err(|e| AppError::VectorIndex(format!("Failed to insert source: {}", e)))?;
            tx.commit()
                .map_err(|e| AppError::VectorIndex(format!("Failed to commit source: {}", e)))?;
            Ok(written)
        })
        .await
    }

    /// Remove a source and all of its chunks. Returns the number of chunks deleted.
    pub async fn delete_reference(&self, reference: &str) -> AppResult<usize> {
        let reference = reference.to_string();
        self.run(move |conn| {
            let tx = conn.transaction().map_err(|e| {
                AppError::VectorIndex(format!("Failed to begin transaction: {}", e))
            })?;
            let deleted = delete_reference_in(&tx, &reference)?;
            tx.commit()
                .map_err(|e| AppError::VectorIndex(format!("Failed to commit delete: {}", e)))?;
            Ok(deleted)
        })
        .await
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> AppResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || f(&mut *lock(&conn)?))
            .await
            .map_err(|e| AppError::VectorIndex(format!("Index task failed: {}", e)))?
    }
}

#[async_trait::async_trait]
impl VectorIndex for SqliteIndex {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<RetrievalResult>> {
        let query_embedding = query_embedding.to_vec();
        self.run(move |conn| search_chunks(conn, &query_embedding, top_k)).await
    }

    async fn upsert(&self, chunks: &[IndexedChunk]) -> AppResult<usize> {
        let chunks = chunks.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction().map_err(|e| {
                AppError::VectorIndex(format!("Failed to begin transaction: {}", e))
            })?;
            let written = insert_chunks(&tx, &chunks)?;
            tx.commit()
                .map_err(|e| AppError::VectorIndex(format!("Failed to commit chunks: {}", e)))?;
            Ok(written)
        })
        .await
    }

    async fn count(&self) -> AppResult<usize> {
        let (_, chunks) = self.run(|conn| count_rows(conn)).await?;
        Ok(chunks as usize)
    }
}

fn lock(conn: &Mutex<Connection>) -> AppResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| AppError::VectorIndex("SQLite connection lock poisoned".to_string()))
}

fn count_rows(conn: &Connection) -> AppResult<(u32, u32)> {
    let sources_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM sources", [], |row| row.get(0))
        .map_err(|e| AppError::VectorIndex(format!("Failed to count sources: {}", e)))?;
    let chunks_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
        .map_err(|e| AppError::VectorIndex(format!("Failed to count chunks: {}", e)))?;
    Ok((sources_count as u32, chunks_count as u32))
}

fn search_chunks(
    conn: &Connection,
    query_embedding: &[f32],
    top_k: usize,
) -> AppResult<Vec<RetrievalResult>> {
    let mut stmt = conn
        .prepare("SELECT reference, text, embedding, metadata FROM chunks")
        .map_err(|e| AppError::VectorIndex(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            let reference: String = row.get(0)?;
            let text: String = row.get(1)?;
            let embedding: Vec<u8> = row.get(2)?;
            let metadata: String = row.get(3)?;
            Ok((reference, text, embedding, metadata))
        })
        .map_err(|e| AppError::VectorIndex(format!("Failed to query chunks: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        let (reference, text, embedding_bytes, metadata_json) =
            row.map_err(|e| AppError::VectorIndex(format!("Failed to read chunk: {}", e)))?;
        let embedding = bytes_to_embedding(&embedding_bytes)?;
        let metadata: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&metadata_json)
                .map_err(|e| AppError::VectorIndex(format!("Corrupt chunk metadata: {}", e)))?;

        results.push(RetrievalResult {
            score: cosine_similarity(query_embedding, &embedding),
            text,
            source: reference,
            metadata,
        });
    }

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(top_k);

    tracing::debug!(
        "Retrieved {} chunks (requested top-{})",
        results.len(),
        top_k
    );

    Ok(results)
}

fn insert_chunks(tx: &Transaction<'_>, chunks: &[IndexedChunk]) -> AppResult<usize> {
    for chunk in chunks {
        let metadata_json = serde_json::to_string(&chunk.metadata)?;
        tx.execute(
            "INSERT INTO chunks (id, reference, position, text, embedding, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(reference, position) DO UPDATE SET
                text = excluded.text,
                embedding = excluded.embedding,
                metadata = excluded.metadata",
            params![
                uuid::Uuid::new_v4().to_string(),
                chunk.reference,
                chunk.position as i64,
                chunk.text,
                embedding_to_bytes(&chunk.embedding),
                metadata_json,
            ],
        )
        .map_err(|e| AppError::VectorIndex(format!("Failed to insert chunk: {}", e)))?;
    }
    Ok(chunks.len())
}

fn delete_reference_in(tx: &Transaction<'_>, reference: &str) -> AppResult<usize> {
    let deleted = tx
        .execute("DELETE FROM chunks WHERE reference = ?1", params![reference])
        .map_err(|e| AppError::VectorIndex(format!("Failed to delete chunks: {}", e)))?;
    tx.execute("DELETE FROM sources WHERE reference = ?1", params![reference])
        .map_err(|e| AppError::VectorIndex(format!("Failed to delete source: {}", e)))?;
    Ok(deleted)
}

fn init_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            reference TEXT PRIMARY KEY,
            content_type TEXT NOT NULL,
            loaded_at TEXT NOT NULL,
            size_bytes INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            reference TEXT NOT NULL,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            metadata TEXT NOT NULL,
            UNIQUE (reference, position)
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_reference ON chunks(reference);
        "#,
    )
    .map_err(|e| AppError::VectorIndex(format!("Failed to create tables: {}", e)))
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::VectorIndex("Invalid embedding bytes length".to_string()));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
