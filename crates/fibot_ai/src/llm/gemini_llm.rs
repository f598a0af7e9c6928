use fibot_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::{GenerationParams, Llm};
use crate::gemini::GeminiClient;
use crate::http::{http_error, GENERATE_TIMEOUT};

/// Hosted generation through Gemini's `generateContent`.
#[derive(Debug, Clone)]
pub struct GeminiLlm {
    client: GeminiClient,
}

impl GeminiLlm {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

impl GenerationConfig {
    fn from_params(params: &GenerationParams) -> Self {
        Self {
            temperature: params.temperature,
            max_output_tokens: params.max_output_tokens,
            top_k: params.top_k,
            seed: params.seed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// Concatenated text parts of the first candidate.
fn first_candidate_text(resp: GenerateContentResponse) -> Result<String, AppError> {
    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AppError::new("AI_LLM_FAILED", "Model returned no candidates"))?;
    let finish = candidate.finish_reason.clone().unwrap_or_default();
    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(AppError::new("AI_LLM_FAILED", "Model response was empty")
            .with_details(format!("finish_reason={finish}")));
    }
    Ok(text)
}

impl Llm for GeminiLlm {
    fn generate(&self, model: &str, prompt: &str, params: &GenerationParams) -> Result<String, AppError> {
        let req = GenerateContentRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig::from_params(params),
        };
        let body = serde_json::to_value(req).map_err(|e| {
            AppError::new("AI_LLM_FAILED", "Failed to encode generate request").with_details(e.to_string())
        })?;

        tracing::debug!(model, prompt_chars = prompt.len(), "gemini generateContent");
        let resp = ureq::post(&self.client.model_url(model, "generateContent"))
            .set("x-goog-api-key", self.client.api_key())
            .timeout(GENERATE_TIMEOUT)
            .send_json(body)
            .map_err(|e| http_error("AI_LLM_UNREACHABLE", "generate", e))?;

        let v: GenerateContentResponse = resp.into_json().map_err(|e| {
            AppError::new("AI_LLM_FAILED", "Failed to decode generate response").with_details(e.to_string())
        })?;
        first_candidate_text(v)
    }
}
