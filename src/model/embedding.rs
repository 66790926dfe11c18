//! Conversions between `rig` embeddings and the little-endian `f32` blobs
//! libsql stores in `F32_BLOB` columns.

use rig::embeddings::Embedding;

/// Helper functions for moving embeddings in and out of the index
pub trait EmbeddingConversion {
    /// Number of dimensions in the vector
    fn dimensions(&self) -> usize;
    fn to_vec(&self) -> Vec<f32>;
    fn to_binary(&self) -> Vec<u8>;
    fn from_binary(binary: &[u8]) -> Self;
}

impl EmbeddingConversion for Embedding {
    fn dimensions(&self) -> usize {
        self.vec.len()
    }

    fn to_vec(&self) -> Vec<f32> {
        self.vec.iter().map(|f| *f as f32).collect()
    }

    fn to_binary(&self) -> Vec<u8> {
        vector_to_blob(&self.to_vec())
    }

    fn from_binary(binary: &[u8]) -> Self {
        Self {
            document: String::new(),
            vec: blob_to_vector(binary).into_iter().map(f64::from).collect(),
        }
    }
}

/// Encode a vector as the blob layout expected by `vector_distance_cos`.
pub fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a blob written by [`vector_to_blob`]. Trailing partial bytes are ignored.
pub fn blob_to_vector(binary: &[u8]) -> Vec<f32> {
    binary
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_blob_layout() {
        let embedding = Embedding {
            document: "doc".to_string(),
            vec: vec![1.0, -2.5, 3.0],
        };

        let binary = embedding.to_binary();
        assert_eq!(binary.len(), 12);
        assert_eq!(&binary[0..4], &1.0f32.to_le_bytes());

        let recovered = Embedding::from_binary(&binary);
        assert_eq!(recovered.to_vec(), vec![1.0, -2.5, 3.0]);
        assert_eq!(recovered.dimensions(), 3);
    }

    #[test]
    fn test_blob_ignores_partial_trailing_bytes() {
        let mut blob = vector_to_blob(&[0.5, 0.25]);
        blob.push(7);
        assert_eq!(blob_to_vector(&blob), vec![0.5, 0.25]);
    }
}
