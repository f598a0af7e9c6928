use fibot_core::error::AppError;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{DatasetSource, DatasetSplit};
use crate::http::{http_error, DATASET_PAGE_TIMEOUT};

pub const HF_DATASETS_SERVER_URL: &str = "https://datasets-server.huggingface.co";

/// Datasets are read from their default config.
const DATASET_CONFIG: &str = "default";

/// The rows endpoint caps a page at 100 rows.
const PAGE_LEN: usize = 100;

/// Pages through the train split of a Hugging Face dataset via the datasets-server `/rows` API.
#[derive(Debug, Clone)]
pub struct HfRowsSource {
    base_url: String,
    max_rows: Option<usize>,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RowEnvelope {
    row: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RowsPage {
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default)]
    rows: Vec<RowEnvelope>,
    #[serde(default)]
    num_rows_total: Option<usize>,
}

impl HfRowsSource {
    pub fn new() -> Self {
        Self {
            base_url: HF_DATASETS_SERVER_URL.to_string(),
            max_rows: None,
            token: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Stop after this many rows per dataset.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let t = token.into();
        self.token = (!t.trim().is_empty()).then_some(t);
        self
    }

    fn fetch_page(&self, dataset: &str, offset: usize, length: usize) -> Result<RowsPage, AppError> {
        let url = format!("{}/rows", self.base_url);
        let mut req = ureq::get(&url)
            .timeout(DATASET_PAGE_TIMEOUT)
            .query("dataset", dataset)
            .query("config", DATASET_CONFIG)
            .query("split", "train")
            .query("offset", &offset.to_string())
            .query("length", &length.to_string());
        if let Some(t) = &self.token {
            req = req.set("Authorization", &format!("Bearer {t}"));
        }
        let resp = req
            .call()
            .map_err(|e| http_error("CORPUS_SOURCE_FAILED", "dataset rows", e))?;
        resp.into_json().map_err(|e| {
            AppError::new("CORPUS_SOURCE_FAILED", "Failed to decode dataset rows page")
                .with_details(format!("dataset={dataset}; offset={offset}; err={e}"))
                .with_retryable(true)
        })
    }
}

impl Default for HfRowsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetSource for HfRowsSource {
    fn train_split(&self, dataset: &str) -> Result<DatasetSplit, AppError> {
        let mut split = DatasetSplit::default();
        let mut offset = 0usize;
        loop {
            let want = match self.max_rows {
                Some(max) if offset >= max => break,
                Some(max) => PAGE_LEN.min(max - offset),
                None => PAGE_LEN,
            };
            let page = self.fetch_page(dataset, offset, want)?;
            if split.columns.is_empty() {
                split.columns = page.features.into_iter().map(|f| f.name).collect();
            }
            let got = page.rows.len();
            split.rows.extend(page.rows.into_iter().map(|r| r.row));
            offset += got;
            tracing::debug!(dataset, offset, "fetched dataset page");

            let done = got == 0 || page.num_rows_total.is_some_and(|total| offset >= total);
            if done {
                break;
            }
        }
        Ok(split)
    }
}
