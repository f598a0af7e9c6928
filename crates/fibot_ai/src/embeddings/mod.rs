use fibot_core::error::AppError;

/// Turns text into a fixed-length vector. Must be deterministic for a given model.
pub trait Embedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError>;
}

pub mod gemini_embed;
pub mod hashing;
pub mod ollama_embed;

pub use gemini_embed::GeminiEmbedder;
pub use hashing::HashingEmbedder;
pub use ollama_embed::OllamaEmbedder;

/// Keep requests bounded. Chunking enforces reasonable sizes, but queries are user text.
pub(crate) fn clip_input(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}
