use std::time::Duration;

use fibot_core::error::AppError;

pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

const HEALTH_TIMEOUT: Duration = Duration::from_millis(800);

/// Client settings for a local Ollama server. Strictly limited to `127.0.0.1`.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
}

fn valid_port(raw: &str) -> bool {
    !raw.is_empty()
        && raw.bytes().all(|b| b.is_ascii_digit())
        && matches!(raw.parse::<u32>(), Ok(p) if (1..=65535).contains(&p))
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();

        let rest = base_url.strip_prefix("http://127.0.0.1");
        let ok = match rest {
            Some("") => true,
            Some(r) => r.strip_prefix(':').is_some_and(valid_port),
            None => false,
        };
        if !ok {
            return Err(AppError::new(
                "AI_REMOTE_NOT_ALLOWED",
                "Ollama base URL must be localhost (127.0.0.1)",
            )
            .with_details(format!("base_url={base_url}")));
        }

        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Short `/api/tags` request made before local embedding or generation.
    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        match ureq::get(&url).timeout(HEALTH_TIMEOUT).call() {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, _)) => Err(AppError::new(
                "AI_OLLAMA_UNHEALTHY",
                "Ollama health check failed",
            )
            .with_details(format!("url={url}; status={code}"))),
            Err(e) => Err(AppError::new(
                "AI_OLLAMA_UNREACHABLE",
                "Ollama is not running on 127.0.0.1; start it with `ollama serve`",
            )
            .with_details(format!("url={url}; err={e}"))
            .with_retryable(true)),
        }
    }
}
