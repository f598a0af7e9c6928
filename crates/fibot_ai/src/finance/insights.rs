use fibot_core::analytics::{detect_anomalies, SpendingAnomaly};
use fibot_core::domain::Transaction;
use fibot_core::error::AppError;

use crate::llm::{GenerationParams, Llm};
use crate::prompts;

/// Transactions fed to the trend prompt.
pub const TREND_WINDOW: usize = 15;

#[derive(Debug, Clone)]
pub struct SpendingInsights {
    pub anomalies: Vec<SpendingAnomaly>,
    pub trends: String,
}

pub fn trend_prompt(recent: &[Transaction]) -> Result<String, AppError> {
    let window = &recent[..recent.len().min(TREND_WINDOW)];
    let records = serde_json::to_string(window).map_err(|e| {
        AppError::new("PROMPT_RENDER_FAILED", "Failed to encode transactions").with_details(e.to_string())
    })?;
    prompts::spending_trends()?.render(&[("records", &records)])
}

/// Anomalies over the whole ledger plus a model-written trend summary of the newest rows.
///
/// `all` and `recent` are both newest first. An empty ledger yields no anomalies and
/// no model call.
pub fn spending_insights(
    llm: &dyn Llm,
    model: &str,
    all: &[Transaction],
    recent: &[Transaction],
) -> Result<Option<SpendingInsights>, AppError> {
    if all.is_empty() {
        return Ok(None);
    }
    let anomalies = detect_anomalies(all);
    let prompt = trend_prompt(recent)?;
    let trends = llm.generate(model, &prompt, &GenerationParams::STRUCTURED)?;
    tracing::info!(model, anomalies = anomalies.len(), "spending insights ready");
    Ok(Some(SpendingInsights {
        anomalies,
        trends: trends.trim().to_string(),
    }))
}
