use std::fs;
use std::path::PathBuf;

use fibot_core::error::AppError;
use serde_json::{Map, Value};

use super::{DatasetSource, DatasetSplit};

/// Offline datasets: `<root>/<owner>__<name>.jsonl`, one JSON object per line.
///
/// Column order is the key order of the first row as written in the file. Later
/// rows may add columns, which are appended in first-seen order.
#[derive(Debug, Clone)]
pub struct JsonlSource {
    root: PathBuf,
}

impl JsonlSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, dataset: &str) -> PathBuf {
        self.root.join(format!("{}.jsonl", dataset.replace('/', "__")))
    }
}

impl DatasetSource for JsonlSource {
    fn train_split(&self, dataset: &str) -> Result<DatasetSplit, AppError> {
        let path = self.path_for(dataset);
        let raw = fs::read_to_string(&path).map_err(|e| {
            AppError::new("CORPUS_SOURCE_FAILED", "Failed to read dataset file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;

        let mut columns: Vec<String> = Vec::new();
        let mut rows: Vec<Map<String, Value>> = Vec::new();
        for (i, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row: Map<String, Value> = serde_json::from_str(line).map_err(|e| {
                AppError::new("CORPUS_SOURCE_FAILED", "Dataset line is not a JSON object")
                    .with_details(format!("path={}; line={}; err={}", path.display(), i + 1, e))
            })?;
            for k in row.keys() {
                if !columns.iter().any(|c| c == k) {
                    columns.push(k.clone());
                }
            }
            rows.push(row);
        }
        Ok(DatasetSplit { columns, rows })
    }
}
