use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::domain::{now_timestamp, QaHistoryRecord};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Append-only log of answered questions.
///
/// There is no update or delete. An empty store lists as an empty vec.
pub trait HistoryStore {
    /// Names the backing store, so cached reads of two stores never collide.
    fn store_id(&self) -> String;
    fn append(&self, question: &str, answer: &str) -> Result<QaHistoryRecord, AppError>;
    fn list(&self, limit: usize, order: HistoryOrder) -> Result<Vec<QaHistoryRecord>, AppError>;
}

/// History kept in the `search_history` table.
pub struct SqliteHistoryStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteHistoryStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl HistoryStore for SqliteHistoryStore<'_> {
    fn store_id(&self) -> String {
        format!("sqlite:{}:search_history", self.conn.path().unwrap_or(":memory:"))
    }

    fn append(&self, question: &str, answer: &str) -> Result<QaHistoryRecord, AppError> {
        let timestamp = now_timestamp()?;
        self.conn
            .execute(
                "INSERT INTO search_history(question, answer, timestamp) VALUES (?1, ?2, ?3)",
                params![question, answer, timestamp],
            )
            .map_err(|e| {
                AppError::new("DB_INSERT_FAILED", "Failed to append search history")
                    .with_details(e.to_string())
            })?;
        Ok(QaHistoryRecord {
            id: Some(self.conn.last_insert_rowid()),
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: Some(timestamp),
        })
    }

    fn list(&self, limit: usize, order: HistoryOrder) -> Result<Vec<QaHistoryRecord>, AppError> {
        let sql = match order {
            HistoryOrder::NewestFirst => {
                "SELECT id, question, answer, timestamp FROM search_history ORDER BY timestamp DESC, id DESC LIMIT ?1"
            }
            HistoryOrder::OldestFirst => {
                "SELECT id, question, answer, timestamp FROM search_history ORDER BY timestamp ASC, id ASC LIMIT ?1"
            }
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = self.conn.prepare(sql).map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to prepare history query").with_details(e.to_string())
        })?;
        let rows = stmt
            .query_map([limit], |row| {
                Ok(QaHistoryRecord {
                    id: Some(row.get(0)?),
                    question: row.get(1)?,
                    answer: row.get(2)?,
                    timestamp: Some(row.get(3)?),
                })
            })
            .map_err(|e| {
                AppError::new("DB_QUERY_FAILED", "Failed to query history").with_details(e.to_string())
            })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r.map_err(|e| {
                AppError::new("DB_QUERY_FAILED", "Failed to decode history row").with_details(e.to_string())
            })?);
        }
        Ok(out)
    }
}

/// Question/answer pairs in a two-column CSV file, one record per line, oldest first.
///
/// The whole file is rewritten on every append.
#[derive(Debug, Clone)]
pub struct CsvHistoryFile {
    path: PathBuf,
}

impl CsvHistoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all pairs in file order. A missing file is an empty history; rows with
    /// fewer than two fields are skipped.
    pub fn load(&self) -> Result<Vec<(String, String)>, AppError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| {
                AppError::new("HISTORY_READ_FAILED", "Failed to open history file")
                    .with_details(format!("path={}; err={}", self.path.display(), e))
            })?;

        let mut out = Vec::new();
        for rec in rdr.records() {
            let rec = rec.map_err(|e| {
                AppError::new("HISTORY_READ_FAILED", "Failed to read history row")
                    .with_details(format!("path={}; err={}", self.path.display(), e))
            })?;
            if rec.len() < 2 {
                continue;
            }
            out.push((rec[0].to_string(), rec[1].to_string()));
        }
        Ok(out)
    }

    pub fn save(&self, pairs: &[(String, String)]) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::new("HISTORY_WRITE_FAILED", "Failed to create history directory")
                    .with_details(format!("path={}; err={}", parent.display(), e))
            })?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp)
            .map_err(|e| {
                AppError::new("HISTORY_WRITE_FAILED", "Failed to create history file")
                    .with_details(format!("path={}; err={}", tmp.display(), e))
            })?;
        for (q, a) in pairs {
            wtr.write_record([q.as_str(), a.as_str()]).map_err(|e| {
                AppError::new("HISTORY_WRITE_FAILED", "Failed to write history row")
                    .with_details(e.to_string())
            })?;
        }
        wtr.flush().map_err(|e| {
            AppError::new("HISTORY_WRITE_FAILED", "Failed to flush history file")
                .with_details(e.to_string())
        })?;
        drop(wtr);

        fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::new("HISTORY_WRITE_FAILED", "Failed to finalize history file")
                .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), self.path.display(), e))
        })
    }
}

impl HistoryStore for CsvHistoryFile {
    fn store_id(&self) -> String {
        format!("csv:{}", self.path.display())
    }

    fn append(&self, question: &str, answer: &str) -> Result<QaHistoryRecord, AppError> {
        let mut pairs = self.load()?;
        pairs.push((question.to_string(), answer.to_string()));
        self.save(&pairs)?;
        Ok(QaHistoryRecord {
            id: Some(pairs.len() as i64),
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: None,
        })
    }

    fn list(&self, limit: usize, order: HistoryOrder) -> Result<Vec<QaHistoryRecord>, AppError> {
        let records = self
            .load()?
            .into_iter()
            .enumerate()
            .map(|(i, (question, answer))| QaHistoryRecord {
                id: Some(i as i64 + 1),
                question,
                answer,
                timestamp: None,
            });
        Ok(match order {
            HistoryOrder::OldestFirst => records.take(limit).collect(),
            HistoryOrder::NewestFirst => {
                let mut all = records.collect::<Vec<_>>();
                all.reverse();
                all.truncate(limit);
                all
            }
        })
    }
}

/// Short label for picking a past question from a list.
pub fn history_label(question: &str) -> String {
    const MAX: usize = 30;
    let mut label: String = question.chars().take(MAX).collect();
    if question.chars().count() > MAX {
        label.push_str("...");
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_truncate_on_char_boundaries() {
        assert_eq!(history_label("What is SIP?"), "What is SIP?");
        let long = "₹".repeat(40);
        let label = history_label(&long);
        assert_eq!(label.chars().count(), 33);
        assert!(label.ends_with("..."));
    }
}
