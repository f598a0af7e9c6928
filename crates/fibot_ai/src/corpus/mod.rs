use fibot_core::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod hf_rows;
pub mod jsonl;

pub use hf_rows::HfRowsSource;
pub use jsonl::JsonlSource;

pub const DEFAULT_DATASETS: [&str; 3] = [
    "SALT-NLP/FLUE-FiQA",
    "sujet-ai/Sujet-Finance-Instruct-177k",
    "bilalRahib/fiqa-personal-finance-dataset",
];

/// Train split of one dataset: column names in source order plus the raw rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSplit {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

/// Something that can hand over the train split of a named dataset.
pub trait DatasetSource {
    fn train_split(&self, dataset: &str) -> Result<DatasetSplit, AppError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorpusRecord {
    pub text: String,
    pub dataset: String,
}

fn cell_text(row: &Map<String, Value>, column: &str) -> String {
    match row.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn has(columns: &[String], name: &str) -> bool {
    columns.iter().any(|c| c == name)
}

/// Flatten a split to text using the first matching rule:
/// `text`, then `sentence`, then `question` + `answer`, then the first column.
pub fn extract_texts(split: &DatasetSplit) -> Vec<String> {
    let cols = &split.columns;
    if has(cols, "text") {
        return split.rows.iter().map(|r| cell_text(r, "text")).collect();
    }
    if has(cols, "sentence") {
        return split.rows.iter().map(|r| cell_text(r, "sentence")).collect();
    }
    if has(cols, "question") && has(cols, "answer") {
        return split
            .rows
            .iter()
            .map(|r| format!("Q: {}\nA: {}", cell_text(r, "question"), cell_text(r, "answer")))
            .collect();
    }
    match cols.first() {
        Some(first) => split.rows.iter().map(|r| cell_text(r, first)).collect(),
        None => Vec::new(),
    }
}

/// Load every dataset in order. One failing source fails the whole load.
pub fn load_corpus<S: AsRef<str>>(
    source: &dyn DatasetSource,
    datasets: &[S],
) -> Result<Vec<CorpusRecord>, AppError> {
    let mut out = Vec::new();
    for name in datasets {
        let name = name.as_ref();
        let split = source.train_split(name).map_err(|e| {
            AppError::new("CORPUS_SOURCE_FAILED", "Failed to load dataset")
                .with_details(format!("dataset={name}; err={e}; details={}", e.details.clone().unwrap_or_default()))
                .with_retryable(e.retryable)
        })?;
        let texts = extract_texts(&split);
        tracing::info!(dataset = name, rows = split.rows.len(), texts = texts.len(), "dataset loaded");
        out.extend(texts.into_iter().map(|text| CorpusRecord {
            text,
            dataset: name.to_string(),
        }));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn split(columns: &[&str], rows: Vec<Value>) -> DatasetSplit {
        DatasetSplit {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(m) => Some(m),
                    _ => None,
                })
                .collect(),
        }
    }

    #[test]
    fn text_column_wins_over_everything() {
        let s = split(
            &["question", "answer", "text"],
            vec![json!({"question": "q", "answer": "a", "text": "plain"})],
        );
        assert_eq!(extract_texts(&s), vec!["plain".to_string()]);
    }

    #[test]
    fn sentence_then_question_answer_then_first_column() {
        let s = split(&["label", "sentence"], vec![json!({"label": 1, "sentence": "s1"})]);
        assert_eq!(extract_texts(&s), vec!["s1".to_string()]);

        let s = split(
            &["question", "answer"],
            vec![json!({"question": "What is SIP?", "answer": "Systematic Investment Plan."})],
        );
        assert_eq!(
            extract_texts(&s),
            vec!["Q: What is SIP?\nA: Systematic Investment Plan.".to_string()]
        );

        let s = split(&["score", "body"], vec![json!({"score": 4.5, "body": "x"})]);
        assert_eq!(extract_texts(&s), vec!["4.5".to_string()]);
    }

    #[test]
    fn question_without_answer_falls_back_to_first_column() {
        let s = split(&["instruction", "question"], vec![json!({"instruction": "i", "question": "q"})]);
        assert_eq!(extract_texts(&s), vec!["i".to_string()]);
    }

    #[test]
    fn no_columns_yields_nothing() {
        assert!(extract_texts(&DatasetSplit::default()).is_empty());
    }
}
