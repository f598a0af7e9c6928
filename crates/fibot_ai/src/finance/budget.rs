use std::collections::BTreeMap;

use fibot_core::analytics::{health_score, BudgetAllocation, BudgetReport, HealthBand};
use fibot_core::domain::Transaction;
use fibot_core::error::AppError;
use fibot_core::ledger::category_totals;

use crate::llm::{GenerationParams, Llm};
use crate::output::{parse_embedded_json, ModelOutput};
use crate::prompts;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetRequest {
    pub total_budget: f64,
    pub allocation: BudgetAllocation,
}

impl Default for BudgetRequest {
    fn default() -> Self {
        Self {
            total_budget: 50_000.0,
            allocation: BudgetAllocation::default(),
        }
    }
}

impl BudgetRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.total_budget.is_finite() || self.total_budget <= 0.0 {
            return Err(AppError::new("VALIDATION_BUDGET", "Monthly budget must be a positive number")
                .with_details(format!("total_budget={}", self.total_budget)));
        }
        self.allocation.validate()
    }
}

#[derive(Debug, Clone)]
pub struct BudgetAnalysis {
    pub category_totals: BTreeMap<String, f64>,
    pub report: ModelOutput<BudgetReport>,
    /// Present only when the report parsed.
    pub health: Option<(u32, HealthBand)>,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|e| {
        AppError::new("PROMPT_RENDER_FAILED", "Failed to encode prompt data").with_details(e.to_string())
    })
}

pub fn budget_prompt(totals: &BTreeMap<String, f64>, req: &BudgetRequest) -> Result<String, AppError> {
    let totals = to_json(totals)?;
    let budget = req.total_budget.to_string();
    let allocation = to_json(&req.allocation.as_map())?;
    let limits = to_json(&req.allocation.limits(req.total_budget))?;
    prompts::budget_summary()?.render(&[
        ("category_totals", &totals),
        ("total_budget", &budget),
        ("allocation", &allocation),
        ("limits", &limits),
    ])
}

/// Ask the model to review spending against the allocation.
///
/// `Ok(None)` when there are no transactions yet. A reply that does not parse
/// comes back as [`ModelOutput::Malformed`] with no health score.
pub fn analyze_budget(
    llm: &dyn Llm,
    model: &str,
    txns: &[Transaction],
    req: &BudgetRequest,
) -> Result<Option<BudgetAnalysis>, AppError> {
    req.validate()?;
    if txns.is_empty() {
        return Ok(None);
    }
    let totals = category_totals(txns);
    let prompt = budget_prompt(&totals, req)?;
    let raw = llm.generate(model, &prompt, &GenerationParams::STRUCTURED)?;

    let report: ModelOutput<BudgetReport> = parse_embedded_json(&raw);
    let health = report.parsed().map(|r| {
        let score = health_score(&r.summary);
        (score, HealthBand::for_score(score))
    });
    if !report.is_parsed() {
        tracing::warn!(model, "budget reply did not contain a usable JSON report");
    }
    Ok(Some(BudgetAnalysis {
        category_totals: totals,
        report,
        health,
    }))
}
