use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
// Deterministic figures only; model-written analysis lives in fibot_ai.

use crate::domain::Transaction;
use crate::error::AppError;

/// A transaction that sits well above its category's usual amount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpendingAnomaly {
    pub transaction_id: i64,
    pub category: String,
    pub amount: f64,
    pub date: String,
    /// `mean + 2 * std` of the category the amount exceeded.
    pub threshold: f64,
}

impl SpendingAnomaly {
    pub fn message(&self) -> String {
        format!(
            "Unusual spike in {} (₹{}) on {}",
            self.category, self.amount, self.date
        )
    }
}

/// Flag amounts strictly above `mean + 2 * sample_std` of their category.
///
/// Needs at least three transactions overall and three within a category for
/// that category to be considered. Categories are visited in first-seen order.
pub fn detect_anomalies(txns: &[Transaction]) -> Vec<SpendingAnomaly> {
    if txns.len() < 3 {
        return Vec::new();
    }

    let mut order: Vec<&str> = Vec::new();
    let mut by_cat: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for t in txns {
        let entry = by_cat.entry(t.category.as_str()).or_default();
        if entry.is_empty() {
            order.push(t.category.as_str());
        }
        entry.push(t);
    }

    let mut out = Vec::new();
    for cat in order {
        let rows = &by_cat[cat];
        if rows.len() < 3 {
            continue;
        }
        let n = rows.len() as f64;
        let mean = rows.iter().map(|t| t.amount).sum::<f64>() / n;
        let var = rows.iter().map(|t| (t.amount - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let threshold = mean + 2.0 * var.sqrt();
        for t in rows.iter().filter(|t| t.amount > threshold) {
            out.push(SpendingAnomaly {
                transaction_id: t.id,
                category: t.category.clone(),
                amount: t.amount,
                date: t.date.clone(),
                threshold,
            });
        }
    }
    out
}

/// Target split of a monthly budget, in whole percentages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BudgetAllocation {
    pub needs: u32,
    pub wants: u32,
    pub savings: u32,
    pub investments: u32,
}

impl Default for BudgetAllocation {
    fn default() -> Self {
        Self {
            needs: 50,
            wants: 30,
            savings: 10,
            investments: 10,
        }
    }
}

impl BudgetAllocation {
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, pct) in self.as_map() {
            if pct > 100 {
                return Err(AppError::new(
                    "VALIDATION_ALLOCATION",
                    "Allocation percentages must be between 0 and 100",
                )
                .with_details(format!("{name}={pct}")));
            }
        }
        Ok(())
    }

    pub fn as_map(&self) -> BTreeMap<&'static str, u32> {
        BTreeMap::from([
            ("needs", self.needs),
            ("wants", self.wants),
            ("savings", self.savings),
            ("investments", self.investments),
        ])
    }

    /// Spending limit per bucket for a total monthly budget.
    pub fn limits(&self, total_budget: f64) -> BTreeMap<&'static str, f64> {
        self.as_map()
            .into_iter()
            .map(|(k, pct)| (k, total_budget * f64::from(pct) / 100.0))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Ok,
    Exceeded,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetBucket {
    pub spent: f64,
    pub limit: f64,
    pub status: BudgetStatus,
}

/// Budget review as written by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetReport {
    pub summary: BTreeMap<String, BudgetBucket>,
    #[serde(default)]
    pub anomalies: Vec<String>,
    #[serde(default)]
    pub advice: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Excellent,
    Monitor,
    HighStress,
}

impl HealthBand {
    pub fn for_score(score: u32) -> Self {
        match score {
            s if s >= 80 => HealthBand::Excellent,
            s if s >= 50 => HealthBand::Monitor,
            _ => HealthBand::HighStress,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthBand::Excellent => "Excellent",
            HealthBand::Monitor => "Monitor Spends",
            HealthBand::HighStress => "High Stress",
        }
    }
}

fn exceeded_penalty(bucket: &str) -> u32 {
    match bucket {
        "needs" => 20,
        "wants" => 15,
        "savings" => 25,
        "investments" => 20,
        _ => 10,
    }
}

/// 100 minus a fixed penalty for every exceeded bucket, never below 0.
pub fn health_score(summary: &BTreeMap<String, BudgetBucket>) -> u32 {
    let penalty: u32 = summary
        .iter()
        .filter(|(_, b)| b.status == BudgetStatus::Exceeded)
        .map(|(k, _)| exceeded_penalty(k))
        .sum();
    100u32.saturating_sub(penalty)
}

/// Monthly SIP projection: contributions at the start of each month, compounded
/// monthly at `annual_rate_pct / 12`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct SipProjection {
    pub invested: f64,
    pub future_value: f64,
    pub gains: f64,
}

/// Future value of a monthly SIP, `P * ((1 + r)^m - 1) / r * (1 + r)` with
/// `r = rate / 12 / 100` and `m = years * 12`. A zero rate is plain saving.
pub fn sip_future_value(monthly: f64, annual_rate_pct: f64, years: u32) -> Result<SipProjection, AppError> {
    if !monthly.is_finite() || monthly <= 0.0 {
        return Err(AppError::new("VALIDATION_SIP", "Monthly amount must be a positive number")
            .with_details(format!("monthly={monthly}")));
    }
    if !annual_rate_pct.is_finite() || !(0.0..=100.0).contains(&annual_rate_pct) {
        return Err(AppError::new("VALIDATION_SIP", "Expected return must be between 0 and 100 percent")
            .with_details(format!("annual_rate_pct={annual_rate_pct}")));
    }
    if years == 0 || years > 100 {
        return Err(AppError::new("VALIDATION_SIP", "Duration must be between 1 and 100 years")
            .with_details(format!("years={years}")));
    }

    let months = years * 12;
    let invested = monthly * f64::from(months);
    let r = annual_rate_pct / 12.0 / 100.0;
    let future_value = if r == 0.0 {
        invested
    } else {
        // months <= 1200, so the exponent always fits in i32.
        let growth = (1.0 + r).powi(months as i32);
        monthly * ((growth - 1.0) / r) * (1.0 + r)
    };
    Ok(SipProjection {
        invested,
        future_value,
        gains: future_value - invested,
    })
}
