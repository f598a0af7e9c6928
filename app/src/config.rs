use std::path::PathBuf;

use fibot_ai::corpus::{DatasetSource, HfRowsSource, JsonlSource, DEFAULT_DATASETS};
use fibot_ai::embeddings::{Embedder, GeminiEmbedder, HashingEmbedder, OllamaEmbedder};
use fibot_ai::gemini::GeminiClient;
use fibot_ai::llm::{GeminiLlm, ModelFallback, OllamaLlm};
use fibot_ai::ollama::OllamaClient;
use fibot_core::error::AppError;

use crate::cli::{ConfigArgs, EmbedderKind};

/// Settings resolved from flags and environment. Secrets are checked when a
/// command needs them, not at startup, so offline commands work without a key.
#[derive(Debug, Clone)]
pub struct AppConfig {
    gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub advisor_models: Vec<String>,
    pub db_path: PathBuf,
    pub index_dir: PathBuf,
    pub history_file: PathBuf,
    pub corpus_dir: Option<PathBuf>,
    pub max_rows: Option<usize>,
    hf_token: Option<String>,
    pub ollama_url: String,
    pub embedder: EmbedderKind,
    pub embed_model: String,
    pub local_model: String,
    pub datasets: Vec<String>,
}

impl AppConfig {
    pub fn from_args(args: ConfigArgs) -> Self {
        Self {
            gemini_api_key: args.gemini_api_key.filter(|k| !k.trim().is_empty()),
            gemini_model: args.gemini_model,
            advisor_models: args.advisor_models,
            db_path: args.db,
            index_dir: args.index_dir,
            history_file: args.history_file,
            corpus_dir: args.corpus_dir,
            max_rows: args.max_rows,
            hf_token: args.hf_token,
            ollama_url: args.ollama_url,
            embedder: args.embedder,
            embed_model: args.embed_model,
            local_model: args.local_model,
            datasets: DEFAULT_DATASETS.iter().map(|d| d.to_string()).collect(),
        }
    }

    pub fn gemini_client(&self) -> Result<GeminiClient, AppError> {
        let key = self
            .gemini_api_key
            .as_deref()
            .ok_or_else(|| AppError::missing_secret("GEMINI_API_KEY"))?;
        GeminiClient::new(key)
    }

    pub fn gemini_llm(&self) -> Result<GeminiLlm, AppError> {
        Ok(GeminiLlm::new(self.gemini_client()?))
    }

    pub fn advisor_fallback(&self) -> Result<ModelFallback, AppError> {
        ModelFallback::new(self.advisor_models.iter().cloned())
    }

    pub fn ollama_client(&self) -> Result<OllamaClient, AppError> {
        OllamaClient::new(&self.ollama_url)
    }

    pub fn local_llm(&self) -> Result<OllamaLlm, AppError> {
        Ok(OllamaLlm::new(self.ollama_client()?))
    }

    pub fn embedder(&self) -> Result<Box<dyn Embedder>, AppError> {
        Ok(match self.embedder {
            EmbedderKind::Ollama => Box::new(OllamaEmbedder::new(self.ollama_client()?)),
            EmbedderKind::Gemini => Box::new(GeminiEmbedder::new(self.gemini_client()?)),
            EmbedderKind::Hashing => Box::new(HashingEmbedder::default()),
        })
    }

    pub fn dataset_source(&self) -> Box<dyn DatasetSource> {
        match &self.corpus_dir {
            Some(dir) => Box::new(JsonlSource::new(dir)),
            None => {
                let mut src = HfRowsSource::new();
                if let Some(max) = self.max_rows {
                    src = src.with_max_rows(max);
                }
                if let Some(token) = &self.hf_token {
                    src = src.with_token(token.clone());
                }
                Box::new(src)
            }
        }
    }
}
