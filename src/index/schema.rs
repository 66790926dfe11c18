//! # Database Schema Module
//!
//! Two tables back the index:
//!
//! 1. `index_meta` - key/value pairs recording the embedding model and
//!    dimensionality the index was built with
//! 2. `chunks` - one row per chunk, keyed by its deterministic content id,
//!    with the embedding stored as an `F32_BLOB` of the recorded dimensionality
//!
//! The vector column's width is fixed when the table is created, so the
//! dimensionality must be known before `initialize_chunks` runs.

use crate::index::error::DbError;
use libsql::{Connection, params};

pub const META_EMBEDDING_MODEL: &str = "embedding_model";
pub const META_EMBEDDING_DIMENSIONS: &str = "embedding_dimensions";

/// Create the metadata table
pub async fn initialize_meta(conn: &Connection) -> Result<(), DbError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create index_meta table: {}", e)))?;
    Ok(())
}

/// Create the chunks table and its lookup index
pub async fn initialize_chunks(conn: &Connection, dimensions: usize) -> Result<(), DbError> {
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL,
                title TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                word_count INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding F32_BLOB({dimensions}) NOT NULL,
                indexed_at TEXT NOT NULL
            )"
        ),
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create chunks table: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_chunks_url ON chunks(url, chunk_index)",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create index on chunks url: {}", e)))?;

    Ok(())
}
