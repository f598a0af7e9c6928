use fibot_core::error::AppError;

use crate::llm::{GenerationParams, Llm};
use crate::prompts;

/// Result of one synthesis attempt. `answer` is always displayable; on failure it
/// carries a `⚠️ Response Error: ...` line and `error` is set.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub answer: String,
    pub prompt: String,
    pub error: Option<AppError>,
}

impl Synthesis {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct AnswerSynthesizer<'a> {
    llm: &'a dyn Llm,
    model: String,
    params: GenerationParams,
}

impl<'a> AnswerSynthesizer<'a> {
    pub fn new(llm: &'a dyn Llm, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            params: GenerationParams::DETERMINISTIC,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn synthesize(&self, question: &str, context: &str) -> Synthesis {
        let prompt = match prompts::rag_answer().and_then(|t| t.render(&[("context", context), ("question", question)])) {
            Ok(p) => p,
            Err(e) => return failed(String::new(), e),
        };
        match self.llm.generate(&self.model, &prompt, &self.params) {
            Ok(text) => Synthesis {
                answer: text.trim().to_string(),
                prompt,
                error: None,
            },
            Err(e) => {
                tracing::warn!(model = %self.model, error = %e, "answer synthesis failed");
                failed(prompt, e)
            }
        }
    }
}

fn failed(prompt: String, e: AppError) -> Synthesis {
    let why = match &e.details {
        Some(d) => format!("{}: {}", e.message, d),
        None => e.message.clone(),
    };
    Synthesis {
        answer: format!("⚠️ Response Error: {why}"),
        prompt,
        error: Some(e),
    }
}
