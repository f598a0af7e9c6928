use fibot_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::{clip_input, Embedder};
use crate::gemini::GeminiClient;
use crate::http::{http_error, EMBED_TIMEOUT};

#[derive(Debug, Clone)]
pub struct GeminiEmbedder {
    client: GeminiClient,
}

impl GeminiEmbedder {
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
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    content: Content<'a>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

impl Embedder for GeminiEmbedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let req = EmbedContentRequest {
            content: Content {
                parts: [Part {
                    text: clip_input(input, 8_000),
                }],
            },
        };
        let body = serde_json::to_value(req).map_err(|e| {
            AppError::new("AI_EMBEDDINGS_FAILED", "Failed to encode embeddings request")
                .with_details(e.to_string())
        })?;

        let resp = ureq::post(&self.client.model_url(model, "embedContent"))
            .set("x-goog-api-key", self.client.api_key())
            .timeout(EMBED_TIMEOUT)
            .send_json(body)
            .map_err(|e| http_error("AI_EMBEDDINGS_FAILED", "embeddings", e))?;

        let v: EmbedContentResponse = resp.into_json().map_err(|e| {
            AppError::new("AI_EMBEDDINGS_FAILED", "Failed to decode embeddings response")
                .with_details(e.to_string())
        })?;
        if v.embedding.values.is_empty() {
            return Err(AppError::new(
                "AI_EMBEDDINGS_FAILED",
                "Embeddings response was empty",
            ));
        }
        Ok(v.embedding.values)
    }
}
