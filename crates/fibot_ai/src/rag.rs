use fibot_core::error::AppError;
use fibot_core::history::HistoryStore;
use fibot_core::reads::CachedReads;
use fibot_core::session::SessionContext;

use crate::retrieve::Retriever;
use crate::synth::AnswerSynthesizer;

#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<String>,
    pub error: Option<AppError>,
    /// False when the answer was not written to history (failure or repeat).
    pub recorded: bool,
    /// The question was already on display; nothing was generated.
    pub repeated: bool,
}

/// Append to history and drop cached reads. A failing store is logged, not raised.
pub(crate) fn record_answer(history: &dyn HistoryStore, reads: &CachedReads, question: &str, answer: &str) -> bool {
    let ok = match history.append(question, answer) {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, details = ?e.details, "failed to record answer in history");
            false
        }
    };
    reads.invalidate_all();
    ok
}

/// Retrieval-augmented question answering over the finance corpus.
pub struct RagAssistant<'a> {
    retriever: Retriever<'a>,
    synthesizer: AnswerSynthesizer<'a>,
}

impl<'a> RagAssistant<'a> {
    pub fn new(retriever: Retriever<'a>, synthesizer: AnswerSynthesizer<'a>) -> Self {
        Self { retriever, synthesizer }
    }

    /// Retrieve, synthesize, record. Only successful answers are written to history.
    pub fn ask(
        &self,
        session: &mut SessionContext,
        history: &dyn HistoryStore,
        reads: &CachedReads,
        question: &str,
    ) -> Result<RagAnswer, AppError> {
        let q = question.trim();
        if q.is_empty() {
            return Err(AppError::new("VALIDATION_QUERY", "Question must not be empty"));
        }
        if session.is_repeat_question(q) {
            if let Some(sel) = session.selected() {
                return Ok(RagAnswer {
                    question: sel.question.clone(),
                    answer: sel.answer.clone(),
                    sources: sel.sources.clone(),
                    error: None,
                    recorded: false,
                    repeated: true,
                });
            }
        }

        let retrieval = self.retriever.retrieve(q)?;
        let synthesis = self.synthesizer.synthesize(q, &retrieval.context);
        let sources = retrieval.sources();

        let recorded = synthesis.is_ok() && record_answer(history, reads, q, &synthesis.answer);
        session.show_answer(q, &synthesis.answer, sources.clone());
        tracing::info!(model = self.synthesizer.model(), hits = sources.len(), ok = synthesis.is_ok(), "rag answer");

        Ok(RagAnswer {
            question: q.to_string(),
            answer: synthesis.answer,
            sources,
            error: synthesis.error,
            recorded,
            repeated: false,
        })
    }
}
