//! Content processor module for RAG
//!
//! Turns crawled pages into index entries: every page is split into word
//! windows, every window gets a deterministic content id, and the windows are
//! embedded in sequential batches and upserted into the index.
//!
//! A failing embedding batch aborts the rest of the run. Batches already
//! written stay in the index; re-running ingestion overwrites them by id.

mod chunking;
mod config;
mod error;

pub use chunking::{TextChunk, chunk_words};
pub use config::{ChunkOptions, ProcessorConfig, ProcessorConfigBuilder};
pub use error::ProcessError;

use crate::crawler::CrawledPage;
use crate::index::{ChunkMetadata, Database, IndexedChunk, chunk_id};
use crate::model::Client;
use rig::{completion::CompletionModel, embeddings::EmbeddingModel};
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, instrument, warn};

/// Progress events emitted while building the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexProgress {
    /// Chunking finished; `chunks` windows will be embedded in `batches` calls
    Started { pages: usize, chunks: usize, batches: usize },

    /// One batch was embedded and written
    BatchIndexed { done: usize, total: usize },

    /// Every batch was written and stale entries were pruned
    Finished { chunks: usize, pruned: u64 },
}

/// Summary of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub pages: usize,
    pub chunks: usize,
    pub batches: usize,
    pub pruned: u64,
}

/// A chunk waiting for its embedding
#[derive(Debug, Clone)]
pub struct PendingChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Chunk every page and assign content ids, preserving page and chunk order
pub fn prepare_chunks(pages: &[CrawledPage], options: &ChunkOptions) -> Vec<PendingChunk> {
    pages
        .iter()
        .flat_map(|page| {
            chunk_words(&page.text, options)
                .into_iter()
                .map(move |chunk| PendingChunk {
                    id: chunk_id(&page.url, chunk.position),
                    metadata: ChunkMetadata {
                        source: page.url.clone(),
                        title: page.title.clone(),
                        chunk_index: chunk.position,
                        word_count: chunk.word_count,
                    },
                    text: chunk.text,
                })
        })
        .collect()
}

async fn report_progress(progress: &Option<Sender<IndexProgress>>, event: IndexProgress) {
    if let Some(sender) = progress {
        // Ignore errors from sending (e.g., if receiver is dropped)
        let _ = sender.send(event).await;
    }
}

/// Chunk, embed and upsert `pages` into `db`.
///
/// # Arguments
///
/// * `client` - Supplies the embedding oracle
/// * `db` - The index to write to
/// * `pages` - Pages accepted by the crawler
/// * `config` - Chunking and batching options
/// * `progress` - Optional channel for progress updates
#[instrument(skip_all, fields(pages = pages.len()))]
pub async fn index_pages<C, E>(
    client: &Client<C, E>,
    db: &Database,
    pages: &[CrawledPage],
    config: &ProcessorConfig,
    progress: Option<Sender<IndexProgress>>,
) -> Result<IndexReport, ProcessError>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    let pending = prepare_chunks(pages, &config.chunk_options);
    let batch_size = config.embedding_batch_size.min(E::MAX_DOCUMENTS).max(1);
    let total_batches = pending.len().div_ceil(batch_size);
    info!(
        chunks = pending.len(),
        batch_size, total_batches, "chunked pages for embedding"
    );
    report_progress(
        &progress,
        IndexProgress::Started {
            pages: pages.len(),
            chunks: pending.len(),
            batches: total_batches,
        },
    )
    .await;

    let mut report = IndexReport {
        pages: pages.len(),
        ..IndexReport::default()
    };

    for (batch_number, batch) in pending.chunks(batch_size).enumerate() {
        let texts = batch.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = client.embed_batch(texts).await.inspect_err(|e| {
            warn!(batch = batch_number, error = %e, "embedding batch failed, aborting ingestion");
        })?;

        let records: Vec<IndexedChunk> = batch
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk {
                id: chunk.id.clone(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                embedding,
            })
            .collect();
        report.chunks += db.upsert_chunks(&records).await?;
        report.batches += 1;
        debug!(batch = batch_number, written = records.len(), "batch indexed");

        report_progress(
            &progress,
            IndexProgress::BatchIndexed {
                done: report.batches,
                total: total_batches,
            },
        )
        .await;
    }

    for page in pages {
        let chunk_count = pending
            .iter()
            .filter(|chunk| chunk.metadata.source == page.url)
            .count();
        report.pruned += db.prune_source(&page.url, chunk_count).await?;
    }

    info!(
        chunks = report.chunks,
        pruned = report.pruned,
        "index build finished"
    );
    report_progress(
        &progress,
        IndexProgress::Finished {
            chunks: report.chunks,
            pruned: report.pruned,
        },
    )
    .await;
    Ok(report)
}
