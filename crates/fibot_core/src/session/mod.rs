use serde::{Deserialize, Serialize};

use crate::domain::QaHistoryRecord;
use crate::throttle::Throttle;

/// The answer currently on display, with the retrieved passages that backed it (if any).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedAnswer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<String>,
}

/// Per-session state handed to every interaction handler.
///
/// Created when a session starts and dropped when it ends. Fields change only
/// through the methods below.
#[derive(Debug, Default)]
pub struct SessionContext {
    selected: Option<SelectedAnswer>,
    nlu_context: String,
    throttle: Throttle,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_throttle(throttle: Throttle) -> Self {
        Self {
            throttle,
            ..Self::default()
        }
    }

    pub fn selected(&self) -> Option<&SelectedAnswer> {
        self.selected.as_ref()
    }

    pub fn show_answer(&mut self, question: &str, answer: &str, sources: Vec<String>) {
        self.selected = Some(SelectedAnswer {
            question: question.to_string(),
            answer: answer.to_string(),
            sources,
        });
    }

    /// Re-display a past answer. Sources are not stored with history.
    pub fn select_history(&mut self, record: &QaHistoryRecord) {
        self.show_answer(&record.question, &record.answer, Vec::new());
    }

    /// True when `question` is what is already on display, so asking again is a no-op.
    pub fn is_repeat_question(&self, question: &str) -> bool {
        self.selected
            .as_ref()
            .is_some_and(|s| s.question == question.trim())
    }

    pub fn nlu_context(&self) -> &str {
        &self.nlu_context
    }

    pub fn append_nlu_turn(&mut self, query: &str, analysis_json: &str) {
        self.nlu_context
            .push_str(&format!("\nUser: {query}\nNLU: {analysis_json}"));
    }

    pub fn clear_nlu_context(&mut self) {
        self.nlu_context.clear();
    }

    pub fn throttle_mut(&mut self) -> &mut Throttle {
        &mut self.throttle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nlu_context_accumulates_turns() {
        let mut s = SessionContext::new();
        s.append_nlu_turn("spent 500 on food", r#"{"intent":"log_expense"}"#);
        s.append_nlu_turn("and 200 on travel", r#"{"intent":"log_expense"}"#);
        assert_eq!(
            s.nlu_context(),
            "\nUser: spent 500 on food\nNLU: {\"intent\":\"log_expense\"}\nUser: and 200 on travel\nNLU: {\"intent\":\"log_expense\"}"
        );
        s.clear_nlu_context();
        assert!(s.nlu_context().is_empty());
    }

    #[test]
    fn selecting_history_replaces_display() {
        let mut s = SessionContext::new();
        s.show_answer("What is SIP?", "Systematic Investment Plan.", vec!["ctx".to_string()]);
        assert!(s.is_repeat_question("What is SIP?"));

        s.select_history(&QaHistoryRecord {
            id: Some(1),
            question: "What is an ETF?".to_string(),
            answer: "Exchange traded fund.".to_string(),
            timestamp: None,
        });
        let sel = s.selected().expect("selected");
        assert_eq!(sel.question, "What is an ETF?");
        assert!(sel.sources.is_empty());
        assert!(!s.is_repeat_question("What is SIP?"));
    }
}
