use std::fs;
use std::path::Path;

use fibot_core::error::AppError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::chunking::{chunk_records, ChunkConfig, TextChunk};
use crate::corpus::{load_corpus, DatasetSource};
use crate::embeddings::Embedder;

pub mod similarity;

const META_FILE: &str = "index_meta.json";
const ENTRIES_FILE: &str = "index_entries.json";

/// Distance reported for zero-length vectors: the cosine distance of opposite vectors.
pub const ZERO_VECTOR_DISTANCE: f32 = 2.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub chunk: TextChunk,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexMeta {
    pub model: String,
    pub dims: usize,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: TextChunk,
    pub distance: f32,
}

/// Exact nearest-neighbour index over chunk embeddings, ranked by cosine distance.
///
/// Entries are never mutated after build; a changed corpus means a full rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingIndex {
    model: String,
    dims: usize,
    entries: Vec<IndexEntry>,
}

impl EmbeddingIndex {
    /// Embed every chunk in order. All vectors must share one dimension.
    pub fn build(chunks: &[TextChunk], embedder: &dyn Embedder, model: &str) -> Result<Self, AppError> {
        let mut dims: Option<usize> = None;
        let mut entries = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let v = embedder.embed(model, &chunk.content).map_err(|e| {
                AppError::new("AI_EMBEDDINGS_FAILED", "Failed to compute embeddings")
                    .with_details(format!("chunk={}; source_id={}; err={}", i, chunk.source_id, e))
                    .with_retryable(e.retryable)
            })?;
            match dims {
                Some(d) if d != v.len() => {
                    return Err(AppError::new(
                        "AI_INDEX_BUILD_FAILED",
                        "Embedding dimension mismatch across chunks",
                    )
                    .with_details(format!("expected={}; got={}; chunk={}", d, v.len(), i)));
                }
                Some(_) => {}
                None => dims = Some(v.len()),
            }
            entries.push(IndexEntry {
                vector: v,
                chunk: chunk.clone(),
            });
        }
        tracing::info!(model, chunks = entries.len(), dims = dims.unwrap_or(0), "index built");
        Ok(Self {
            model: model.to_string(),
            dims: dims.unwrap_or(0),
            entries,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn meta(&self) -> IndexMeta {
        IndexMeta {
            model: self.model.clone(),
            dims: self.dims,
            count: self.entries.len(),
        }
    }

    /// Stable digest of model, chunk text and vector bits.
    pub fn fingerprint(&self) -> String {
        let mut h = Sha256::new();
        h.update(self.model.as_bytes());
        h.update((self.dims as u64).to_le_bytes());
        for e in &self.entries {
            h.update(e.chunk.source_id.as_bytes());
            h.update([0u8]);
            h.update(e.chunk.content.as_bytes());
            h.update([0u8]);
            for x in &e.vector {
                h.update(x.to_bits().to_le_bytes());
            }
        }
        hex::encode(h.finalize())
    }

    /// Up to `min(k, len)` chunks, nearest first. Zero-length vectors have no
    /// direction and are reported at [`ZERO_VECTOR_DISTANCE`], the largest cosine
    /// distance, so they rank after every real hit. Ties keep insertion order.
    pub fn query(&self, embedder: &dyn Embedder, text: &str, k: usize) -> Result<Vec<ScoredChunk>, AppError> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        let qv = embedder.embed(&self.model, text)?;
        if qv.len() != self.dims {
            return Err(AppError::new(
                "AI_RETRIEVAL_FAILED",
                "Query embedding dims do not match index dims",
            )
            .with_details(format!("index_dims={}; query_dims={}", self.dims, qv.len())));
        }
        let qnorm = similarity::l2_norm(&qv);

        let mut ranked: Vec<(f32, bool, usize)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let vnorm = similarity::l2_norm(&e.vector);
                match similarity::cosine_distance(&qv, &e.vector, qnorm, vnorm) {
                    Some(d) if d.is_finite() => (d.clamp(0.0, ZERO_VECTOR_DISTANCE), false, i),
                    _ => (ZERO_VECTOR_DISTANCE, true, i),
                }
            })
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
        ranked.truncate(k);

        Ok(ranked
            .into_iter()
            .map(|(distance, _, i)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                distance,
            })
            .collect())
    }

    /// Write `index_entries.json` then `index_meta.json`, each via tmp file and rename.
    pub fn persist(&self, dir: &Path) -> Result<(), AppError> {
        fs::create_dir_all(dir).map_err(|e| {
            AppError::new("AI_INDEX_BUILD_FAILED", "Failed to create index directory")
                .with_details(format!("path={}; err={}", dir.display(), e))
        })?;
        write_json_atomic(&dir.join(ENTRIES_FILE), &self.entries)?;
        write_json_atomic(&dir.join(META_FILE), &self.meta())?;
        tracing::info!(path = %dir.display(), entries = self.entries.len(), "index persisted");
        Ok(())
    }

    /// Load a persisted index as-is. No freshness check against the corpus.
    pub fn load(dir: &Path) -> Result<Self, AppError> {
        if !dir.is_dir() {
            return Err(AppError::new(
                "AI_INDEX_NOT_READY",
                "Index not built; build the index before querying",
            )
            .with_details(format!("path={}", dir.display())));
        }
        let meta: IndexMeta = read_json(&dir.join(META_FILE))?;
        let entries: Vec<IndexEntry> = read_json(&dir.join(ENTRIES_FILE))?;
        if entries.len() != meta.count {
            return Err(AppError::new("AI_INDEX_NOT_READY", "Index files disagree; rebuild index")
                .with_details(format!("meta_count={}; entries={}", meta.count, entries.len())));
        }
        if let Some((i, e)) = entries.iter().enumerate().find(|(_, e)| e.vector.len() != meta.dims) {
            return Err(AppError::new("AI_INDEX_NOT_READY", "Index vector dims mismatch; rebuild index")
                .with_details(format!("entry={i}; expected={}; got={}", meta.dims, e.vector.len())));
        }
        tracing::debug!(path = %dir.display(), entries = entries.len(), "index loaded");
        Ok(Self {
            model: meta.model,
            dims: meta.dims,
            entries,
        })
    }
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AppError> {
    let tmp = path.with_extension("tmp");
    let json = serde_json::to_string(value).map_err(|e| {
        AppError::new("AI_INDEX_BUILD_FAILED", "Failed to encode index file").with_details(e.to_string())
    })?;
    fs::write(&tmp, json.as_bytes()).map_err(|e| {
        AppError::new("AI_INDEX_BUILD_FAILED", "Failed to write index file")
            .with_details(format!("path={}; err={}", tmp.display(), e))
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        AppError::new("AI_INDEX_BUILD_FAILED", "Failed to finalize index file write")
            .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::new("AI_INDEX_NOT_READY", "Failed to read index file")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::new("AI_INDEX_NOT_READY", "Failed to decode index file")
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}

/// Everything needed to build an index from scratch.
pub struct IndexBuildInput<'a> {
    pub source: &'a dyn DatasetSource,
    pub datasets: &'a [String],
    pub chunking: ChunkConfig,
    pub embedder: &'a dyn Embedder,
    pub model: &'a str,
}

/// Load the index at `dir` if the directory exists; otherwise load the corpus,
/// chunk it, build, and persist.
pub fn build_or_load(dir: &Path, input: IndexBuildInput<'_>) -> Result<EmbeddingIndex, AppError> {
    if dir.exists() {
        let index = EmbeddingIndex::load(dir)?;
        tracing::info!(entries = index.len(), fingerprint = %index.fingerprint(), "index loaded");
        return Ok(index);
    }
    let records = load_corpus(input.source, input.datasets)?;
    let chunks = chunk_records(&records, input.chunking);
    tracing::info!(records = records.len(), chunks = chunks.len(), "corpus chunked");
    let index = EmbeddingIndex::build(&chunks, input.embedder, input.model)?;
    index.persist(dir)?;
    tracing::info!(entries = index.len(), fingerprint = %index.fingerprint(), "index built");
    Ok(index)
}
