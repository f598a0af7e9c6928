use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error shared by the store, the AI layer and the CLI.
///
/// `code` is a stable SCREAMING_SNAKE identifier callers can match on; `message` is
/// meant for humans. `retryable` marks external-service failures (network, quota)
/// where trying the same interaction again later may succeed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// A required secret or setting is absent. Fatal for the command that needs it.
    pub fn missing_secret(name: &str) -> Self {
        Self::new("CONFIG_MISSING_SECRET", format!("{name} is not set"))
            .with_details(format!("set {name} in the environment or pass it as a flag"))
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }

    /// Message shown in place of a result when an interaction fails but the process keeps going.
    pub fn user_message(&self) -> String {
        match self.details.as_deref() {
            Some(d) => format!("⚠️ {}: {}", self.message, d),
            None => format!("⚠️ {}", self.message),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
