use fibot_core::error::AppError;

use super::{GenerationParams, Llm};

pub const DEFAULT_ADVISOR_MODELS: [&str; 3] = ["gemini-3-flash", "gemini-2.5-flash", "gemini-2.0-flash"];

pub const NO_MODEL_AVAILABLE: &str = "⚠️ No available models found. Check cloud API permissions.";

/// Outcome of trying a list of models. `text` is always displayable; check `error`
/// to tell a real answer from the sentinel.
#[derive(Debug, Clone)]
pub struct FallbackAnswer {
    pub text: String,
    pub model: Option<String>,
    pub error: Option<AppError>,
}

impl FallbackAnswer {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Ordered model preference. Each model is tried once, in order; the first
/// successful generation wins.
#[derive(Debug, Clone)]
pub struct ModelFallback {
    models: Vec<String>,
}

impl ModelFallback {
    pub fn new<I, S>(models: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let models = models
            .into_iter()
            .map(Into::into)
            .filter(|m: &String| !m.trim().is_empty())
            .collect::<Vec<_>>();
        if models.is_empty() {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "At least one model name is required",
            ));
        }
        Ok(Self { models })
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn generate(&self, llm: &dyn Llm, prompt: &str, params: &GenerationParams) -> FallbackAnswer {
        let mut last_err: Option<AppError> = None;
        for model in &self.models {
            match llm.generate(model, prompt, params) {
                Ok(text) => {
                    tracing::info!(model = %model, "model answered");
                    return FallbackAnswer {
                        text: text.trim().to_string(),
                        model: Some(model.clone()),
                        error: None,
                    };
                }
                Err(e) => {
                    tracing::warn!(model = %model, error = %e, details = ?e.details, "model failed; trying next");
                    last_err = Some(e);
                }
            }
        }

        let tried = self.models.join(",");
        let error = AppError::new("AI_NO_MODEL_AVAILABLE", "No configured model produced an answer")
            .with_details(match last_err {
                Some(e) => format!("tried={tried}; last_error={e}"),
                None => format!("tried={tried}"),
            })
            .with_retryable(true);
        FallbackAnswer {
            text: NO_MODEL_AVAILABLE.to_string(),
            model: None,
            error: Some(error),
        }
    }
}

impl Default for ModelFallback {
    fn default() -> Self {
        Self {
            models: DEFAULT_ADVISOR_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }
}
