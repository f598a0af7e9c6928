use std::time::Duration;

use fibot_core::error::AppError;

pub const GENERATE_TIMEOUT: Duration = Duration::from_secs(60);
pub const EMBED_TIMEOUT: Duration = Duration::from_secs(30);
pub const DATASET_PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Map a `ureq` failure to the shared error shape. 429 and 5xx are worth retrying later.
pub(crate) fn http_error(code: &str, what: &str, err: ureq::Error) -> AppError {
    match err {
        ureq::Error::Status(status, resp) => {
            let body = resp.into_string().unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            AppError::new(code, format!("{what} request failed"))
                .with_details(format!("status={status}; body={snippet}"))
                .with_retryable(status == 429 || status >= 500)
        }
        other => AppError::new(code, format!("Failed to call {what} endpoint"))
            .with_details(other.to_string())
            .with_retryable(true),
    }
}
