//! Database operations for the index module

use chrono::{DateTime, Utc};
use libsql::{Connection, Row, Rows, params};
use rig::embeddings::Embedding;
use tracing::{debug, info, instrument};

use crate::index::error::DbError;
use crate::index::schema::{self, META_EMBEDDING_DIMENSIONS, META_EMBEDDING_MODEL};
use crate::index::{ChunkMetadata, EmbeddingSpace, IndexedChunk, ScoredChunk, SourceSummary};
use crate::model::embedding::{EmbeddingConversion, vector_to_blob};

const UPSERT_CHUNK: &str = "INSERT INTO chunks (id, url, title, chunk_index, word_count, text, embedding, indexed_at)
     VALUES (?, ?, ?, ?, ?, ?, ?, ?)
     ON CONFLICT(id) DO UPDATE SET
     url = excluded.url,
     title = excluded.title,
     chunk_index = excluded.chunk_index,
     word_count = excluded.word_count,
     text = excluded.text,
     embedding = excluded.embedding,
     indexed_at = excluded.indexed_at";

/// Database manager for the index
#[derive(Clone)]
pub struct Database {
    conn: Connection,
    space: EmbeddingSpace,
}

async fn connect(path: &str) -> Result<Connection, DbError> {
    let db = libsql::Builder::new_local(path)
        .build()
        .await
        .map_err(|e| DbError::Connection(format!("Failed to open database: {}", e)))?;

    db.connect()
        .map_err(|e| DbError::Connection(format!("Failed to connect to database: {}", e)))
}

async fn read_space(conn: &Connection) -> Result<Option<EmbeddingSpace>, DbError> {
    let mut rows = conn
        .query("SELECT key, value FROM index_meta", params![])
        .await
        .map_err(|e| DbError::Query(format!("Failed to read index metadata: {}", e)))?;

    let mut model = None;
    let mut dimensions = None;
    while let Some(row) = rows.next().await? {
        let key: String = row
            .get(0)
            .map_err(|e| DbError::Data(format!("Failed to get key: {}", e)))?;
        let value: String = row
            .get(1)
            .map_err(|e| DbError::Data(format!("Failed to get value: {}", e)))?;
        match key.as_str() {
            META_EMBEDDING_MODEL => model = Some(value),
            META_EMBEDDING_DIMENSIONS => {
                dimensions = Some(value.parse::<usize>().map_err(|e| {
                    DbError::Data(format!("Invalid stored dimensionality '{}': {}", value, e))
                })?)
            }
            _ => {}
        }
    }

    Ok(match (model, dimensions) {
        (Some(model), Some(dimensions)) => Some(EmbeddingSpace { model, dimensions }),
        _ => None,
    })
}

async fn write_space(conn: &Connection, space: &EmbeddingSpace) -> Result<(), DbError> {
    for (key, value) in [
        (META_EMBEDDING_MODEL, space.model.clone()),
        (META_EMBEDDING_DIMENSIONS, space.dimensions.to_string()),
    ] {
        conn.execute(
            "INSERT OR REPLACE INTO index_meta (key, value) VALUES (?, ?)",
            params![key, value],
        )
        .await
        .map_err(|e| DbError::Query(format!("Failed to write index metadata: {}", e)))?;
    }
    Ok(())
}

impl Database {
    /// Open the index for the given embedding space.
    ///
    /// The first open records the space; later opens with a different model
    /// or dimensionality fail with `DbError::EmbeddingSpaceMismatch`.
    #[instrument(skip(conn), fields(space = %space))]
    pub async fn new(conn: Connection, space: EmbeddingSpace) -> Result<Self, DbError> {
        schema::initialize_meta(&conn).await?;

        match read_space(&conn).await? {
            Some(stored) if stored != space => {
                return Err(DbError::EmbeddingSpaceMismatch {
                    stored: stored.to_string(),
                    requested: space.to_string(),
                });
            }
            Some(_) => debug!("embedding space matches index"),
            None => {
                info!("recording embedding space for new index");
                write_space(&conn, &space).await?;
            }
        }

        schema::initialize_chunks(&conn, space.dimensions).await?;
        Ok(Self { conn, space })
    }

    /// Create a new database manager from a path
    pub async fn new_from_path(path: &str, space: EmbeddingSpace) -> Result<Self, DbError> {
        Self::new(connect(path).await?, space).await
    }

    /// Open an index that was already built, adopting its recorded embedding space
    pub async fn open_existing(path: &str) -> Result<Self, DbError> {
        let conn = connect(path).await?;
        schema::initialize_meta(&conn).await?;
        let space = read_space(&conn)
            .await?
            .ok_or_else(|| DbError::Schema(format!("No index has been built at {}", path)))?;
        Self::new(conn, space).await
    }

    pub fn embedding_space(&self) -> &EmbeddingSpace {
        &self.space
    }

    /// Execute a custom query with parameters
    pub async fn execute_query<P>(&self, sql: &str, params: P) -> Result<Rows, DbError>
    where
        P: libsql::params::IntoParams,
    {
        self.conn
            .query(sql, params)
            .await
            .map_err(|e| DbError::Query(format!("Failed to execute query: {}", e)))
    }

    fn check_dimensions(&self, actual: usize) -> Result<(), DbError> {
        if actual != self.space.dimensions {
            return Err(DbError::Dimensions {
                expected: self.space.dimensions,
                actual,
            });
        }
        Ok(())
    }

    /// Insert or overwrite chunks by id in one transaction.
    ///
    /// Every vector is checked against the index dimensionality before anything is written.
    #[instrument(skip_all, fields(count = chunks.len()))]
    pub async fn upsert_chunks(&self, chunks: &[IndexedChunk]) -> Result<usize, DbError> {
        if chunks.is_empty() {
            return Ok(0);
        }
        for chunk in chunks {
            self.check_dimensions(chunk.embedding.dimensions())?;
        }

        let indexed_at = Utc::now().to_rfc3339();
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to start transaction: {}", e)))?;

        for chunk in chunks {
            tx.execute(
                UPSERT_CHUNK,
                params![
                    chunk.id.clone(),
                    chunk.metadata.source.clone(),
                    chunk.metadata.title.clone(),
                    chunk.metadata.chunk_index as i64,
                    chunk.metadata.word_count as i64,
                    chunk.text.clone(),
                    libsql::Value::Blob(chunk.embedding.to_binary()),
                    indexed_at.clone(),
                ],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to upsert chunk {}: {}", chunk.id, e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to commit transaction: {}", e)))?;

        debug!("upserted {} chunks", chunks.len());
        Ok(chunks.len())
    }

    /// Delete chunks of `url` at or beyond `keep`; returns the number removed
    pub async fn prune_source(&self, url: &str, keep: usize) -> Result<u64, DbError> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM chunks WHERE url = ? AND chunk_index >= ?",
                params![url, keep as i64],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to prune chunks: {}", e)))?;
        if removed > 0 {
            debug!(url, removed, "pruned stale chunks");
        }
        Ok(removed)
    }

    /// Exact nearest-neighbour search by cosine distance.
    ///
    /// Results are ordered by ascending distance, then by id, and optionally
    /// restricted to sources whose URL contains `source_filter`.
    #[instrument(skip(self, query), fields(dims = query.len()))]
    pub async fn nearest(
        &self,
        query: &[f32],
        limit: usize,
        source_filter: Option<&str>,
    ) -> Result<Vec<ScoredChunk>, DbError> {
        self.check_dimensions(query.len())?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            "SELECT id, url, title, chunk_index, word_count, text,
                vector_distance_cos(embedding, ?) AS distance
             FROM chunks",
        );
        let mut params: Vec<libsql::Value> = vec![libsql::Value::Blob(vector_to_blob(query))];
        if let Some(source) = source_filter {
            // Literal substring match; `%` and `_` in URLs are not wildcards
            sql.push_str(" WHERE instr(url, ?) > 0");
            params.push(source.to_string().into());
        }
        sql.push_str(" ORDER BY distance ASC, id ASC LIMIT ?");
        params.push(libsql::Value::from(limit as i64));

        let mut rows = self
            .conn
            .query(&sql, params)
            .await
            .map_err(|e| DbError::Query(format!("Failed to run vector search: {}", e)))?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(ScoredChunk {
                id: row
                    .get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get id: {}", e)))?,
                metadata: row_to_metadata(&row)?,
                text: row
                    .get(5)
                    .map_err(|e| DbError::Data(format!("Failed to get text: {}", e)))?,
                distance: row
                    .get(6)
                    .map_err(|e| DbError::Data(format!("Failed to get distance: {}", e)))?,
            });
        }
        Ok(results)
    }

    /// All stored chunks of one source, in chunk order
    pub async fn chunks_for_source(&self, url: &str) -> Result<Vec<IndexedChunk>, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, url, title, chunk_index, word_count, text, embedding
                 FROM chunks WHERE url = ? ORDER BY chunk_index",
                params![url],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to get chunks: {}", e)))?;

        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await? {
            let text: String = row
                .get(5)
                .map_err(|e| DbError::Data(format!("Failed to get text: {}", e)))?;
            let blob: Vec<u8> = row
                .get(6)
                .map_err(|e| DbError::Data(format!("Failed to get embedding: {}", e)))?;
            let mut embedding = Embedding::from_binary(&blob);
            embedding.document = text.clone();
            chunks.push(IndexedChunk {
                id: row
                    .get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get id: {}", e)))?,
                metadata: row_to_metadata(&row)?,
                text,
                embedding,
            });
        }
        Ok(chunks)
    }

    /// Total number of chunks in the index
    pub async fn count_chunks(&self) -> Result<usize, DbError> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM chunks", params![])
            .await
            .map_err(|e| DbError::Query(format!("Failed to count chunks: {}", e)))?;
        let count: i64 = match rows.next().await? {
            Some(row) => row
                .get(0)
                .map_err(|e| DbError::Data(format!("Failed to get count: {}", e)))?,
            None => 0,
        };
        Ok(count as usize)
    }

    /// Indexed sources with their chunk counts, ordered by URL
    #[instrument(skip(self))]
    pub async fn list_sources(&self) -> Result<Vec<SourceSummary>, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT url, MAX(title), COUNT(*), MAX(indexed_at)
                 FROM chunks GROUP BY url ORDER BY url",
                params![],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to list sources: {}", e)))?;

        let mut sources = Vec::new();
        while let Some(row) = rows.next().await? {
            let indexed_at: String = row
                .get(3)
                .map_err(|e| DbError::Data(format!("Failed to get indexed_at: {}", e)))?;
            let last_indexed = DateTime::parse_from_rfc3339(&indexed_at)
                .map_err(|e| DbError::Data(format!("Invalid timestamp '{}': {}", indexed_at, e)))?
                .with_timezone(&Utc);
            let chunk_count: i64 = row
                .get(2)
                .map_err(|e| DbError::Data(format!("Failed to get chunk count: {}", e)))?;
            sources.push(SourceSummary {
                url: row
                    .get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get url: {}", e)))?,
                title: row
                    .get(1)
                    .map_err(|e| DbError::Data(format!("Failed to get title: {}", e)))?,
                chunk_count: chunk_count as usize,
                last_indexed,
            });
        }
        Ok(sources)
    }
}

/// Columns 1..=4 of a chunk row: url, title, chunk_index, word_count
fn row_to_metadata(row: &Row) -> Result<ChunkMetadata, DbError> {
    let chunk_index: i64 = row
        .get(3)
        .map_err(|e| DbError::Data(format!("Failed to get chunk_index: {}", e)))?;
    let word_count: i64 = row
        .get(4)
        .map_err(|e| DbError::Data(format!("Failed to get word_count: {}", e)))?;
    Ok(ChunkMetadata {
        source: row
            .get(1)
            .map_err(|e| DbError::Data(format!("Failed to get url: {}", e)))?,
        title: row
            .get(2)
            .map_err(|e| DbError::Data(format!("Failed to get title: {}", e)))?,
        chunk_index: chunk_index as usize,
        word_count: word_count as usize,
    })
}
