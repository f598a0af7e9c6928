use fibot_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::{GenerationParams, Llm};
use crate::http::{http_error, GENERATE_TIMEOUT};
use crate::ollama::OllamaClient;

/// Local text generation through Ollama's `/api/generate`.
#[derive(Debug, Clone)]
pub struct OllamaLlm {
    client: OllamaClient,
}

impl OllamaLlm {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

impl GenerateOptions {
    fn from_params(params: &GenerationParams) -> Self {
        Self {
            temperature: params.temperature,
            num_predict: params.max_output_tokens,
            top_k: params.top_k,
            seed: params.seed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl Llm for OllamaLlm {
    fn generate(&self, model: &str, prompt: &str, params: &GenerationParams) -> Result<String, AppError> {
        let url = format!("{}/api/generate", self.client.base_url());
        let req = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions::from_params(params),
        };
        let body = serde_json::to_value(req).map_err(|e| {
            AppError::new("AI_LLM_FAILED", "Failed to encode generate request").with_details(e.to_string())
        })?;

        tracing::debug!(model, prompt_chars = prompt.len(), "ollama generate");
        let resp = ureq::post(&url)
            .timeout(GENERATE_TIMEOUT)
            .send_json(body)
            .map_err(|e| http_error("AI_LLM_UNREACHABLE", "generate", e))?;

        let v: GenerateResponse = resp.into_json().map_err(|e| {
            AppError::new("AI_LLM_FAILED", "Failed to decode generate response").with_details(e.to_string())
        })?;
        if v.response.trim().is_empty() {
            return Err(AppError::new("AI_LLM_FAILED", "Model response was empty"));
        }
        Ok(v.response)
    }
}
