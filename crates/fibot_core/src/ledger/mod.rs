use std::collections::BTreeMap;

use rusqlite::{params, Connection, Row};

use crate::domain::{now_timestamp, parse_date, NewTransaction, Transaction, SAVINGS_CATEGORIES};
use crate::error::AppError;

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        category: row.get(2)?,
        amount: row.get(3)?,
        timestamp: row.get(4)?,
    })
}

pub fn validate_new_transaction(input: &NewTransaction) -> Result<(), AppError> {
    if !(input.amount.is_finite() && input.amount > 0.0) {
        return Err(
            AppError::new("VALIDATION_AMOUNT", "Amount must be greater than 0")
                .with_details(format!("amount={}", input.amount)),
        );
    }
    if input.category.trim().is_empty() {
        return Err(AppError::new(
            "VALIDATION_CATEGORY",
            "Category must not be empty",
        ));
    }
    parse_date(&input.date)?;
    Ok(())
}

pub fn insert_transaction(conn: &Connection, input: &NewTransaction) -> Result<Transaction, AppError> {
    validate_new_transaction(input)?;
    let timestamp = now_timestamp()?;
    let date = input.date.trim().to_string();
    let category = input.category.trim().to_string();

    conn.execute(
        "INSERT INTO transactions(date, category, amount, timestamp) VALUES (?1, ?2, ?3, ?4)",
        params![date, category, input.amount, timestamp],
    )
    .map_err(|e| {
        AppError::new("DB_INSERT_FAILED", "Failed to insert transaction").with_details(e.to_string())
    })?;

    let tx = Transaction {
        id: conn.last_insert_rowid(),
        date,
        category,
        amount: input.amount,
        timestamp,
    };
    tracing::info!(id = tx.id, category = %tx.category, amount = tx.amount, "transaction logged");
    Ok(tx)
}

fn query_transactions(conn: &Connection, sql: &str, limit: i64) -> Result<Vec<Transaction>, AppError> {
    let mut stmt = conn.prepare(sql).map_err(|e| {
        AppError::new("DB_QUERY_FAILED", "Failed to prepare transactions query")
            .with_details(e.to_string())
    })?;
    let rows = stmt.query_map([limit], row_to_transaction).map_err(|e| {
        AppError::new("DB_QUERY_FAILED", "Failed to query transactions").with_details(e.to_string())
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to decode transaction row")
                .with_details(e.to_string())
        })?);
    }
    Ok(out)
}

/// All transactions, newest calendar date first (latest insert first within a day).
pub fn list_transactions(conn: &Connection) -> Result<Vec<Transaction>, AppError> {
    query_transactions(
        conn,
        r#"
      SELECT id, date, category, amount, timestamp
      FROM transactions
      ORDER BY date DESC, id DESC
      LIMIT ?1
      "#,
        -1,
    )
}

/// The `n` most recently dated transactions, same ordering as [`list_transactions`].
pub fn recent_transactions(conn: &Connection, n: usize) -> Result<Vec<Transaction>, AppError> {
    let limit = i64::try_from(n).unwrap_or(i64::MAX);
    query_transactions(
        conn,
        r#"
      SELECT id, date, category, amount, timestamp
      FROM transactions
      ORDER BY date DESC, id DESC
      LIMIT ?1
      "#,
        limit,
    )
}

pub fn count_transactions(conn: &Connection) -> Result<i64, AppError> {
    conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))
        .map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to count transactions")
                .with_details(e.to_string())
        })
}

/// Sum of amounts per category. Category keys are sorted.
pub fn category_totals(txns: &[Transaction]) -> BTreeMap<String, f64> {
    let mut out: BTreeMap<String, f64> = BTreeMap::new();
    for t in txns {
        *out.entry(t.category.clone()).or_insert(0.0) += t.amount;
    }
    out
}

/// Total contributed to savings-like categories. Zero on an empty ledger.
pub fn savings_total(conn: &Connection) -> Result<f64, AppError> {
    let placeholders = SAVINGS_CATEGORIES
        .iter()
        .enumerate()
        .map(|(i, _)| format!("?{}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT COALESCE(SUM(amount), 0.0) FROM transactions WHERE category IN ({placeholders})"
    );
    conn.query_row(&sql, rusqlite::params_from_iter(SAVINGS_CATEGORIES.iter()), |row| {
        row.get::<_, f64>(0)
    })
    .map_err(|e| {
        AppError::new("DB_QUERY_FAILED", "Failed to aggregate savings total")
            .with_details(e.to_string())
    })
}
