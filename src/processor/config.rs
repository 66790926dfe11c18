//! # Processor Configuration Module
//!
//! Configuration for turning crawled pages into index entries: how pages are
//! split into word windows and how many chunks go to the embedding oracle per
//! call.
//!
//! ## Key Components
//!
//! - `ChunkOptions`: Window size and overlap, validated at construction
//! - `ProcessorConfig`: Chunk options plus embedding batch size
//! - `ProcessorConfigBuilder`: Builder pattern implementation for easier configuration

use crate::processor::error::ProcessError;

/// Configuration for chunking text.
///
/// An overlap at or above the window size would never advance the window, so
/// such options cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    chunk_size_words: usize,
    overlap_words: usize,
}

impl ChunkOptions {
    pub fn new(chunk_size_words: usize, overlap_words: usize) -> Result<Self, ProcessError> {
        if chunk_size_words == 0 {
            return Err(ProcessError::InvalidChunkOptions(
                "chunk size must be at least one word".to_string(),
            ));
        }
        if overlap_words >= chunk_size_words {
            return Err(ProcessError::InvalidChunkOptions(format!(
                "overlap ({overlap_words}) must be smaller than chunk size ({chunk_size_words})"
            )));
        }
        Ok(Self {
            chunk_size_words,
            overlap_words,
        })
    }

    /// Target size of each chunk in words
    pub fn chunk_size_words(&self) -> usize {
        self.chunk_size_words
    }

    /// Words shared by consecutive chunks
    pub fn overlap_words(&self) -> usize {
        self.overlap_words
    }

    /// How far the window advances each step
    pub fn stride(&self) -> usize {
        self.chunk_size_words - self.overlap_words
    }
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size_words: 400,
            overlap_words: 80,
        }
    }
}

/// Configuration for the processor
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Options for chunking
    pub chunk_options: ChunkOptions,

    /// Chunks sent to the embedding oracle per call
    pub embedding_batch_size: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            chunk_options: ChunkOptions::default(),
            embedding_batch_size: 64,
        }
    }
}

/// Builder for ProcessorConfig
#[derive(Debug, Default)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
    chunk_size_words: Option<usize>,
    overlap_words: Option<usize>,
}

impl ProcessorConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target chunk size
    pub fn chunk_size_words(mut self, chunk_size_words: usize) -> Self {
        self.chunk_size_words = Some(chunk_size_words);
        self
    }

    /// Set the overlap size
    pub fn overlap_words(mut self, overlap_words: usize) -> Self {
        self.overlap_words = Some(overlap_words);
        self
    }

    /// Set the embedding batch size
    pub fn embedding_batch_size(mut self, batch_size: usize) -> Self {
        self.config.embedding_batch_size = batch_size;
        self
    }

    /// Validate and build the configuration
    pub fn build(mut self) -> Result<ProcessorConfig, ProcessError> {
        let defaults = ChunkOptions::default();
        self.config.chunk_options = ChunkOptions::new(
            self.chunk_size_words.unwrap_or(defaults.chunk_size_words),
            self.overlap_words.unwrap_or(defaults.overlap_words),
        )?;
        if self.config.embedding_batch_size == 0 {
            return Err(ProcessError::Other(
                "embedding batch size must be at least 1".to_string(),
            ));
        }
        Ok(self.config)
    }
}

impl ProcessorConfig {
    /// Create a new builder
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_options_validation() {
        let options = ChunkOptions::new(10, 3).unwrap();
        assert_eq!(options.stride(), 7);

        assert!(ChunkOptions::new(10, 0).is_ok());
        assert!(matches!(
            ChunkOptions::new(10, 10),
            Err(ProcessError::InvalidChunkOptions(_))
        ));
        assert!(matches!(
            ChunkOptions::new(10, 11),
            Err(ProcessError::InvalidChunkOptions(_))
        ));
        assert!(matches!(
            ChunkOptions::new(0, 0),
            Err(ProcessError::InvalidChunkOptions(_))
        ));
    }

    #[test]
    fn test_processor_config() {
        let config = ProcessorConfig::builder()
            .chunk_size_words(100)
            .overlap_words(20)
            .embedding_batch_size(8)
            .build()
            .unwrap();

        assert_eq!(config.chunk_options.chunk_size_words(), 100);
        assert_eq!(config.chunk_options.overlap_words(), 20);
        assert_eq!(config.embedding_batch_size, 8);
    }

    #[test]
    fn test_processor_config_defaults() {
        let config = ProcessorConfig::builder().build().unwrap();
        assert_eq!(config.chunk_options, ChunkOptions::default());
        assert_eq!(config.chunk_options.chunk_size_words(), 400);
        assert_eq!(config.chunk_options.overlap_words(), 80);
        assert_eq!(config.embedding_batch_size, 64);

        // Overlap alone may invalidate the default size
        assert!(ProcessorConfig::builder().overlap_words(400).build().is_err());
        assert!(ProcessorConfig::builder().embedding_batch_size(0).build().is_err());
    }
}
