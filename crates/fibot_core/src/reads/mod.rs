use std::time::Duration;

use rusqlite::Connection;

use crate::cache::{operation_key, TtlCache};
use crate::domain::{Goal, QaHistoryRecord, Transaction};
use crate::error::AppError;
use crate::goals::list_goals;
use crate::history::{HistoryOrder, HistoryStore};
use crate::ledger::{list_transactions, savings_total};

/// Ledger and goal reads are cached for a minute.
pub const LEDGER_TTL: Duration = Duration::from_secs(60);
/// The history picker is cached for five minutes.
pub const HISTORY_TTL: Duration = Duration::from_secs(300);

/// Memoized reads shared by every handler of one session.
///
/// Any handler that writes to the store must call [`CachedReads::invalidate_all`]
/// before returning.
pub struct CachedReads {
    transactions: TtlCache<String, Vec<Transaction>>,
    totals: TtlCache<String, f64>,
    goals: TtlCache<String, Vec<Goal>>,
    history: TtlCache<String, Vec<QaHistoryRecord>>,
}

impl CachedReads {
    pub fn new() -> Self {
        Self::with_ttls(LEDGER_TTL, HISTORY_TTL)
    }

    pub fn with_ttls(ledger_ttl: Duration, history_ttl: Duration) -> Self {
        Self {
            transactions: TtlCache::new(ledger_ttl),
            totals: TtlCache::new(ledger_ttl),
            goals: TtlCache::new(ledger_ttl),
            history: TtlCache::new(history_ttl),
        }
    }

    pub fn transactions(&self, conn: &Connection) -> Result<Vec<Transaction>, AppError> {
        self.transactions
            .get_or_try_insert_with(operation_key("all_transactions", &[]), || list_transactions(conn))
    }

    pub fn savings_total(&self, conn: &Connection) -> Result<f64, AppError> {
        self.totals
            .get_or_try_insert_with(operation_key("savings_total", &[]), || savings_total(conn))
    }

    pub fn goals(&self, conn: &Connection) -> Result<Vec<Goal>, AppError> {
        self.goals
            .get_or_try_insert_with(operation_key("user_goals", &[]), || list_goals(conn))
    }

    /// Newest-first history for re-selection. A failing store reads as empty.
    pub fn recent_history(&self, store: &dyn HistoryStore, limit: usize) -> Vec<QaHistoryRecord> {
        let key = operation_key("recent_history", &[&store.store_id(), &limit.to_string()]);
        match self
            .history
            .get_or_try_insert_with(key, || store.list(limit, HistoryOrder::NewestFirst))
        {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "history unavailable; showing none");
                Vec::new()
            }
        }
    }

    pub fn invalidate_all(&self) {
        self.transactions.invalidate_all();
        self.totals.invalidate_all();
        self.goals.invalidate_all();
        self.history.invalidate_all();
        tracing::debug!("read cache cleared");
    }
}

impl Default for CachedReads {
    fn default() -> Self {
        Self::new()
    }
}
