use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use fibot_ai::chunking::{ChunkConfig, TextChunk};
use fibot_ai::corpus::{DatasetSource, DatasetSplit, JsonlSource};
use fibot_ai::embeddings::{Embedder, HashingEmbedder};
use fibot_ai::index::{build_or_load, EmbeddingIndex, IndexBuildInput, ZERO_VECTOR_DISTANCE};
use fibot_core::error::AppError;
use pretty_assertions::assert_eq;

struct CountingEmbedder {
    calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for CountingEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let a = input.chars().filter(|c| *c == 'a').count() as f32;
        let b = input.chars().filter(|c| *c == 'b').count() as f32;
        Ok(vec![a, b])
    }
}

/// Returns a vector whose length is the input length; breaks the fixed-dims rule.
struct RaggedEmbedder;

impl Embedder for RaggedEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        Ok(vec![1.0; input.len()])
    }
}

struct Unreachable;

impl DatasetSource for Unreachable {
    fn train_split(&self, _dataset: &str) -> Result<DatasetSplit, AppError> {
        Err(AppError::new("CORPUS_SOURCE_FAILED", "dataset rows request failed").with_retryable(true))
    }
}

fn chunks(texts: &[&str]) -> Vec<TextChunk> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| TextChunk {
            content: t.to_string(),
            source_id: format!("test#{i}"),
        })
        .collect()
}

fn contents(hits: &[fibot_ai::index::ScoredChunk]) -> Vec<&str> {
    hits.iter().map(|h| h.chunk.content.as_str()).collect()
}

#[test]
fn query_returns_at_most_k_in_distance_order() {
    let emb = CountingEmbedder::new();
    let idx = EmbeddingIndex::build(&chunks(&["aaaa", "bbbb", "aabb", "abbb"]), &emb, "mock").unwrap();
    assert_eq!(idx.len(), 4);
    assert_eq!(idx.dims(), 2);

    let hits = idx.query(&emb, "aaa", 3).unwrap();
    assert_eq!(contents(&hits), vec!["aaaa", "aabb", "abbb"]);
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));

    assert_eq!(idx.query(&emb, "aaa", 10).unwrap().len(), 4);
    assert!(idx.query(&emb, "aaa", 0).unwrap().is_empty());
}

#[test]
fn ties_keep_insertion_order_and_zero_vectors_sort_last() {
    let emb = CountingEmbedder::new();
    let idx = EmbeddingIndex::build(&chunks(&["xyz", "ab", "ba", "aabb"]), &emb, "mock").unwrap();

    let hits = idx.query(&emb, "ab", 4).unwrap();
    assert_eq!(contents(&hits), vec!["ab", "ba", "aabb", "xyz"]);
    assert_eq!(hits[3].distance, ZERO_VECTOR_DISTANCE);
}

/// Maps a word to a fixed direction, including one opposite to the others.
struct DirectionEmbedder;

impl Embedder for DirectionEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        Ok(match input {
            "same" => vec![1.0, 0.0],
            "side" => vec![0.0, 1.0],
            "opposite" => vec![-1.0, 0.0],
            _ => vec![0.0, 0.0],
        })
    }
}

#[test]
fn opposite_hits_rank_ahead_of_zero_vectors_in_distance_order() {
    let emb = DirectionEmbedder;
    let idx = EmbeddingIndex::build(&chunks(&["empty", "opposite", "side", "same"]), &emb, "mock").unwrap();

    let hits = idx.query(&emb, "same", 4).unwrap();
    assert_eq!(contents(&hits), vec!["same", "side", "opposite", "empty"]);
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert!((hits[2].distance - 2.0).abs() < 1e-6);
    assert_eq!(hits[3].distance, ZERO_VECTOR_DISTANCE);

    let hits = idx.query(&emb, "same", 2).unwrap();
    assert_eq!(contents(&hits), vec!["same", "side"]);

    // A zero query has no direction: every entry ties and keeps insertion order.
    let hits = idx.query(&emb, "???", 4).unwrap();
    assert_eq!(contents(&hits), vec!["empty", "opposite", "side", "same"]);
    assert!(hits.iter().all(|h| h.distance == ZERO_VECTOR_DISTANCE));
}

#[test]
fn persisted_index_answers_like_the_in_memory_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("faiss_index");
    let emb = HashingEmbedder::default();
    let idx = EmbeddingIndex::build(
        &chunks(&[
            "Q: What is SIP?\nA: Systematic Investment Plan.",
            "An emergency fund covers six months of expenses.",
            "Index funds track a market index at low cost.",
        ]),
        &emb,
        "hash",
    )
    .unwrap();
    idx.persist(&path).unwrap();
    assert!(path.join("index_meta.json").is_file());
    assert!(path.join("index_entries.json").is_file());

    let loaded = EmbeddingIndex::load(&path).unwrap();
    assert_eq!(loaded, idx);
    for question in ["What is SIP?", "emergency fund", "low cost index", "unrelated words"] {
        assert_eq!(loaded.query(&emb, question, 2).unwrap(), idx.query(&emb, question, 2).unwrap());
    }
}

#[test]
fn rebuilding_same_corpus_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let emb = HashingEmbedder::default();
    let corpus = chunks(&["budget your rent first", "then save ten percent"]);

    let first = EmbeddingIndex::build(&corpus, &emb, "hash").unwrap();
    let second = EmbeddingIndex::build(&corpus, &emb, "hash").unwrap();
    first.persist(&dir.path().join("one")).unwrap();
    second.persist(&dir.path().join("two")).unwrap();

    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(
        fs::read(dir.path().join("one/index_entries.json")).unwrap(),
        fs::read(dir.path().join("two/index_entries.json")).unwrap()
    );
}

#[test]
fn dimension_mismatch_fails_the_build() {
    let err = EmbeddingIndex::build(&chunks(&["a", "bb"]), &RaggedEmbedder, "ragged").unwrap_err();
    assert_eq!(err.code, "AI_INDEX_BUILD_FAILED");
}

#[test]
fn loading_a_missing_index_is_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let err = EmbeddingIndex::load(&dir.path().join("absent")).unwrap_err();
    assert_eq!(err.code, "AI_INDEX_NOT_READY");
}

#[test]
fn build_or_load_builds_once_then_reuses_disk() {
    let dir = tempfile::tempdir().unwrap();
    let corpus_root = dir.path().join("corpus");
    fs::create_dir_all(&corpus_root).unwrap();
    let source = JsonlSource::new(&corpus_root);
    fs::write(
        source.path_for("owner/qa"),
        "{\"question\":\"aaa\",\"answer\":\"bbb\"}\n{\"question\":\"ab\",\"answer\":\"ba\"}\n",
    )
    .unwrap();

    let index_dir = dir.path().join("faiss_index");
    let datasets = vec!["owner/qa".to_string()];
    let emb = CountingEmbedder::new();
    let input = || IndexBuildInput {
        source: &source,
        datasets: &datasets,
        chunking: ChunkConfig::default(),
        embedder: &emb,
        model: "mock",
    };

    let built = build_or_load(&index_dir, input()).unwrap();
    assert_eq!(built.len(), 2);
    assert_eq!(built.entries()[0].chunk.content, "Q: aaa\nA: bbb");
    assert_eq!(emb.call_count(), 2);

    let loaded = build_or_load(&index_dir, input()).unwrap();
    assert_eq!(loaded, built);
    assert_eq!(emb.call_count(), 2);
}

#[test]
fn unreachable_corpus_fails_without_writing_an_index() {
    let dir = tempfile::tempdir().unwrap();
    let index_dir = dir.path().join("faiss_index");
    let datasets = vec!["SALT-NLP/FLUE-FiQA".to_string()];
    let emb = CountingEmbedder::new();

    let err = build_or_load(
        &index_dir,
        IndexBuildInput {
            source: &Unreachable,
            datasets: &datasets,
            chunking: ChunkConfig::default(),
            embedder: &emb,
            model: "mock",
        },
    )
    .unwrap_err();
    assert_eq!(err.code, "CORPUS_SOURCE_FAILED");
    assert!(err.retryable);
    assert!(!index_dir.exists());
    assert_eq!(emb.call_count(), 0);
}
