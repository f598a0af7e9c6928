use fibot_core::error::AppError;

use crate::embeddings::Embedder;
use crate::index::{EmbeddingIndex, ScoredChunk};

pub const DEFAULT_TOP_K: usize = 2;
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";
pub const NO_CONTEXT: &str = "No relevant context found.";

#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub chunks: Vec<ScoredChunk>,
    /// Never empty: joined chunk text, or [`NO_CONTEXT`].
    pub context: String,
}

impl Retrieval {
    pub fn sources(&self) -> Vec<String> {
        self.chunks.iter().map(|c| c.chunk.content.clone()).collect()
    }
}

pub struct Retriever<'a> {
    index: &'a EmbeddingIndex,
    embedder: &'a dyn Embedder,
    top_k: usize,
}

impl<'a> Retriever<'a> {
    pub fn new(index: &'a EmbeddingIndex, embedder: &'a dyn Embedder) -> Self {
        Self {
            index,
            embedder,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn retrieve(&self, query: &str) -> Result<Retrieval, AppError> {
        let q = query.trim();
        if q.is_empty() {
            return Err(AppError::new("VALIDATION_QUERY", "Question must not be empty"));
        }
        let chunks = self.index.query(self.embedder, q, self.top_k)?;
        let context = if chunks.is_empty() {
            NO_CONTEXT.to_string()
        } else {
            chunks
                .iter()
                .map(|c| c.chunk.content.as_str())
                .collect::<Vec<_>>()
                .join(CONTEXT_SEPARATOR)
        };
        tracing::debug!(hits = chunks.len(), "retrieved context");
        Ok(Retrieval { chunks, context })
    }
}
