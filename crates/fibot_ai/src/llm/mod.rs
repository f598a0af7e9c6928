use fibot_core::error::AppError;

/// Decoding settings passed with every generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Sample only from the `top_k` likeliest tokens. `Some(1)` is greedy decoding.
    pub top_k: Option<u32>,
    pub seed: Option<u64>,
}

impl GenerationParams {
    /// Greedy decoding with a fixed seed and a bounded answer. Temperature has
    /// no effect once `top_k` is 1.
    pub const DETERMINISTIC: GenerationParams = GenerationParams {
        temperature: 0.2,
        max_output_tokens: 256,
        top_k: Some(1),
        seed: Some(42),
    };

    /// Longer budget for JSON analyses that enumerate several fields. Uses the
    /// backend's default sampling.
    pub const STRUCTURED: GenerationParams = GenerationParams {
        temperature: 0.2,
        max_output_tokens: 1024,
        top_k: None,
        seed: None,
    };
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::DETERMINISTIC
    }
}

pub trait Llm {
    fn generate(&self, model: &str, prompt: &str, params: &GenerationParams) -> Result<String, AppError>;
}

pub mod fallback;
pub mod gemini_llm;
pub mod ollama_llm;

pub use fallback::{FallbackAnswer, ModelFallback};
pub use gemini_llm::GeminiLlm;
pub use ollama_llm::OllamaLlm;
