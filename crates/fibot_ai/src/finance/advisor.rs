use fibot_core::error::AppError;
use fibot_core::history::HistoryStore;
use fibot_core::reads::CachedReads;
use fibot_core::session::SessionContext;

use crate::llm::{GenerationParams, Llm, ModelFallback};
use crate::prompts;
use crate::rag::record_answer;

/// How many past questions the history picker offers.
pub const HISTORY_PICKER_LIMIT: usize = 12;

#[derive(Debug, Clone)]
pub struct AdvisorReply {
    pub question: String,
    pub answer: String,
    pub model: Option<String>,
    pub error: Option<AppError>,
    pub recorded: bool,
}

/// Hosted-model chat with no retrieval step.
pub struct Advisor<'a> {
    llm: &'a dyn Llm,
    fallback: ModelFallback,
    params: GenerationParams,
}

impl<'a> Advisor<'a> {
    pub fn new(llm: &'a dyn Llm, fallback: ModelFallback) -> Self {
        Self {
            llm,
            fallback,
            params: GenerationParams::STRUCTURED,
        }
    }

    /// Throttle, then try each model in order. Both real answers and the
    /// no-model sentinel are written to history.
    pub fn ask(
        &self,
        session: &mut SessionContext,
        history: &dyn HistoryStore,
        reads: &CachedReads,
        question: &str,
    ) -> Result<AdvisorReply, AppError> {
        let q = question.trim();
        if q.is_empty() {
            return Err(AppError::new("VALIDATION_QUERY", "Question must not be empty"));
        }
        session.throttle_mut().admit()?;

        let prompt = prompts::advisor_answer()?.render(&[("question", q)])?;
        let out = self.fallback.generate(self.llm, &prompt, &self.params);
        let recorded = record_answer(history, reads, q, &out.text);
        session.show_answer(q, &out.text, Vec::new());

        Ok(AdvisorReply {
            question: q.to_string(),
            answer: out.text,
            model: out.model,
            error: out.error,
            recorded,
        })
    }
}
