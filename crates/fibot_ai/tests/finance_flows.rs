use std::cell::RefCell;

use fibot_ai::finance::{analyze_budget, analyze_query, spending_insights, BudgetRequest, TREND_WINDOW};
use fibot_ai::llm::{GenerationParams, Llm};
use fibot_ai::output::ModelOutput;
use fibot_core::analytics::{BudgetAllocation, BudgetStatus, HealthBand};
use fibot_core::domain::Transaction;
use fibot_core::error::AppError;
use fibot_core::session::SessionContext;
use pretty_assertions::assert_eq;

struct CannedLlm {
    reply: String,
    prompts: RefCell<Vec<String>>,
}

impl CannedLlm {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: RefCell::new(Vec::new()),
        }
    }

    fn last_prompt(&self) -> String {
        self.prompts.borrow().last().cloned().unwrap_or_default()
    }
}

impl Llm for CannedLlm {
    fn generate(&self, _model: &str, prompt: &str, _params: &GenerationParams) -> Result<String, AppError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

fn tx(id: i64, category: &str, amount: f64) -> Transaction {
    Transaction {
        id,
        date: format!("2024-03-{:02}", (id % 28) + 1),
        category: category.to_string(),
        amount,
        timestamp: String::new(),
    }
}

const REPORT: &str = r#"Here is your review:
{
  "summary": {
    "needs": {"spent": 30000, "limit": 25000, "status": "exceeded"},
    "wants": {"spent": 5000, "limit": 15000, "status": "ok"},
    "savings": {"spent": 6000, "limit": 5000, "status": "ok"},
    "investments": {"spent": 5000, "limit": 5000, "status": "ok"}
  },
  "anomalies": ["Rent doubled in March"],
  "advice": "Renegotiate rent."
}
Good luck!"#;

#[test]
fn budget_report_parses_and_scores() {
    let llm = CannedLlm::new(REPORT);
    let txns = vec![tx(1, "Bills", 30_000.0), tx(2, "Food", 5_000.0), tx(3, "Savings", 6_000.0)];
    let out = analyze_budget(&llm, "gemini-2.5-flash", &txns, &BudgetRequest::default())
        .unwrap()
        .expect("analysis");

    assert_eq!(out.category_totals["Bills"], 30_000.0);
    let report = out.report.parsed().expect("parsed");
    assert_eq!(report.summary["needs"].status, BudgetStatus::Exceeded);
    assert_eq!(report.advice, "Renegotiate rent.");
    assert_eq!(out.health, Some((80, HealthBand::Excellent)));

    let prompt = llm.last_prompt();
    assert!(prompt.contains(r#"{"Bills":30000.0,"Food":5000.0,"Savings":6000.0}"#));
    assert!(prompt.contains("Monthly budget: 50000"));
    assert!(prompt.contains(r#""needs":50"#));
}

#[test]
fn budget_reply_without_json_keeps_raw_text() {
    let llm = CannedLlm::new("Sorry, I cannot help with that.");
    let out = analyze_budget(&llm, "m", &[tx(1, "Food", 10.0)], &BudgetRequest::default())
        .unwrap()
        .expect("analysis");
    match out.report {
        ModelOutput::Malformed { raw, .. } => assert_eq!(raw, "Sorry, I cannot help with that."),
        other => panic!("expected malformed, got {other:?}"),
    }
    assert_eq!(out.health, None);
}

#[test]
fn budget_needs_transactions_and_a_sane_request() {
    let llm = CannedLlm::new(REPORT);
    assert!(analyze_budget(&llm, "m", &[], &BudgetRequest::default()).unwrap().is_none());
    assert!(llm.prompts.borrow().is_empty());

    let bad = BudgetRequest {
        total_budget: 0.0,
        allocation: BudgetAllocation::default(),
    };
    assert_eq!(
        analyze_budget(&llm, "m", &[tx(1, "Food", 1.0)], &bad).unwrap_err().code,
        "VALIDATION_BUDGET"
    );
}

#[test]
fn nlu_parses_fenced_json_and_grows_context() {
    let llm = CannedLlm::new(
        "```json\n{\"intent\":\"log_expense\",\"sentiment\":\"neutral\",\"categories\":[\"Food\"],\
         \"amounts\":[{\"value\":500,\"currency\":\"INR\"}],\"dates\":[\"last week\"]}\n```",
    );
    let mut session = SessionContext::new();

    let out = analyze_query(&llm, "m", &mut session, "I spent ₹500 on groceries last week").unwrap();
    let a = out.analysis.parsed().expect("parsed");
    assert_eq!(a.intent, "log_expense");
    assert_eq!(a.categories, vec!["Food".to_string()]);
    assert!(session
        .nlu_context()
        .starts_with("\nUser: I spent ₹500 on groceries last week\nNLU: {\"intent\":\"log_expense\""));

    analyze_query(&llm, "m", &mut session, "and rent?").unwrap();
    assert!(llm.last_prompt().contains("User: I spent ₹500 on groceries last week"));
    assert!(llm.last_prompt().contains("User query: \"and rent?\""));
}

#[test]
fn nlu_malformed_reply_leaves_context_alone() {
    let llm = CannedLlm::new("intent: log_expense");
    let mut session = SessionContext::new();
    let out = analyze_query(&llm, "m", &mut session, "spent 200").unwrap();
    assert!(!out.analysis.is_parsed());
    assert!(session.nlu_context().is_empty());

    assert_eq!(
        analyze_query(&llm, "m", &mut session, "  ").unwrap_err().code,
        "VALIDATION_QUERY"
    );
}

#[test]
fn insights_flag_spikes_and_send_only_the_recent_window() {
    let llm = CannedLlm::new("- Food is steady\n");
    let mut all: Vec<Transaction> = (1..=20).map(|i| tx(i, "Food", 100.0)).collect();
    all.push(tx(21, "Food", 5_000.0));
    let recent: Vec<Transaction> = all.iter().rev().cloned().collect();

    let out = spending_insights(&llm, "m", &all, &recent).unwrap().expect("insights");
    assert_eq!(out.anomalies.len(), 1);
    assert_eq!(out.anomalies[0].transaction_id, 21);
    assert_eq!(out.trends, "- Food is steady");

    let prompt = llm.last_prompt();
    assert_eq!(prompt.matches("\"category\"").count(), TREND_WINDOW);
    assert!(prompt.contains("Predict month-end risk"));

    assert!(spending_insights(&llm, "m", &[], &[]).unwrap().is_none());
}
