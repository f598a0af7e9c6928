use fibot_core::error::AppError;
use sha2::{Digest, Sha256};

use super::Embedder;

/// Offline embedder: signed feature hashing of lowercase word tokens into `dims` buckets.
///
/// Deterministic across runs and platforms, needs no model server. Similarity reflects
/// shared vocabulary only, so it suits small corpora and tests rather than semantic search.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub const DEFAULT_DIMS: usize = 384;

    pub fn new(dims: usize) -> Result<Self, AppError> {
        if dims == 0 {
            return Err(AppError::new(
                "AI_EMBEDDINGS_FAILED",
                "Hashing embedder needs at least one dimension",
            ));
        }
        Ok(Self { dims })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dims: Self::DEFAULT_DIMS,
        }
    }
}

fn tokens(input: &str) -> impl Iterator<Item = String> + '_ {
    input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

impl Embedder for HashingEmbedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let mut v = vec![0.0f32; self.dims];
        for tok in tokens(input) {
            let mut hasher = Sha256::new();
            hasher.update(model.as_bytes());
            hasher.update([0u8]);
            hasher.update(tok.as_bytes());
            let digest = hasher.finalize();

            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_vector() {
        let e = HashingEmbedder::new(64).unwrap();
        let a = e.embed("hash", "What is SIP?").unwrap();
        let b = e.embed("hash", "what is sip").unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashingEmbedder::default();
        let v = e.embed("hash", "  ...  ").unwrap();
        assert_eq!(v.len(), HashingEmbedder::DEFAULT_DIMS);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn zero_dims_rejected() {
        assert!(HashingEmbedder::new(0).is_err());
    }
}
