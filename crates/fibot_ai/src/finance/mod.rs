//! Model-backed finance flows. Deterministic figures come from `fibot_core::analytics`.

pub mod advisor;
pub mod budget;
pub mod insights;
pub mod nlu;

pub use advisor::{Advisor, AdvisorReply, HISTORY_PICKER_LIMIT};
pub use budget::{analyze_budget, BudgetAnalysis, BudgetRequest};
pub use insights::{spending_insights, SpendingInsights, TREND_WINDOW};
pub use nlu::{analyze_query, NluAmount, NluAnalysis, NluEntity, NluOutcome};
