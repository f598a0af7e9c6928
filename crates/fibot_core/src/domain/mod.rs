use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::AppError;

/// Categories offered when logging a transaction. Stored as plain strings, so
/// imported rows may carry values outside this list.
pub const CATEGORIES: [&str; 11] = [
    "Food",
    "Travel",
    "Entertainment",
    "Bills",
    "Shopping",
    "Medical",
    "Education",
    "Investments",
    "Insurance",
    "Savings",
    "Other",
];

/// Categories whose amounts count towards savings goals.
pub const SAVINGS_CATEGORIES: [&str; 3] = ["Savings", "Investments", "Investment"];

/// A logged expense or contribution.
///
/// - `date` is the calendar day the user entered (`YYYY-MM-DD`).
/// - `timestamp` is when the row was written (UTC, fixed-width so it sorts as text).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub date: String,
    pub category: String,
    pub amount: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTransaction {
    pub date: String,
    pub category: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub id: i64,
    pub name: String,
    pub target: f64,
    pub created_at: String,
}

/// One answered question. `id` and `timestamp` are absent for records read back
/// from the flat CSV history, which only keeps the question/answer pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QaHistoryRecord {
    pub id: Option<i64>,
    pub question: String,
    pub answer: String,
    pub timestamp: Option<String>,
}

/// UTC wall clock as `YYYY-MM-DDTHH:MM:SS.ffffffZ`.
///
/// Fixed width on purpose: rows are ordered by comparing these strings.
pub fn now_timestamp() -> Result<String, AppError> {
    let fmt = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
    );
    OffsetDateTime::now_utc().format(&fmt).map_err(|e| {
        AppError::new("CLOCK_FORMAT_FAILED", "Failed to format current time")
            .with_details(e.to_string())
    })
}

/// Validate a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<time::Date, AppError> {
    let fmt = format_description!("[year]-[month]-[day]");
    time::Date::parse(raw.trim(), &fmt).map_err(|e| {
        AppError::new("VALIDATION_DATE", "Date must be formatted as YYYY-MM-DD")
            .with_details(format!("date={raw}; err={e}"))
    })
}

pub fn is_savings_category(category: &str) -> bool {
    SAVINGS_CATEGORIES.contains(&category)
}
