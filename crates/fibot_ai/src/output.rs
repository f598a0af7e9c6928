use serde::de::DeserializeOwned;

/// Structured model output. Models are not trusted to return valid JSON, so a
/// failed parse keeps the raw text for display instead of raising an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput<T> {
    Parsed(T),
    Malformed { raw: String, reason: String },
}

impl<T> ModelOutput<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, ModelOutput::Parsed(_))
    }

    pub fn parsed(&self) -> Option<&T> {
        match self {
            ModelOutput::Parsed(v) => Some(v),
            ModelOutput::Malformed { .. } => None,
        }
    }

    pub fn into_parsed(self) -> Option<T> {
        match self {
            ModelOutput::Parsed(v) => Some(v),
            ModelOutput::Malformed { .. } => None,
        }
    }
}

/// Remove one leading ```` ``` ```` fence (with an optional `json` tag) and one trailing fence.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// The span from the first `{` to the last `}`, if both exist in that order.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn malformed<T>(raw: &str, reason: impl Into<String>) -> ModelOutput<T> {
    ModelOutput::Malformed {
        raw: raw.to_string(),
        reason: reason.into(),
    }
}

/// Parse a reply that should be JSON, possibly wrapped in a markdown fence.
pub fn parse_fenced_json<T: DeserializeOwned>(raw: &str) -> ModelOutput<T> {
    match serde_json::from_str::<T>(strip_code_fences(raw)) {
        Ok(v) => ModelOutput::Parsed(v),
        Err(e) => {
            tracing::debug!(error = %e, "model output is not valid JSON");
            malformed(raw, e.to_string())
        }
    }
}

/// Parse the outermost `{...}` object found anywhere in the reply.
pub fn parse_embedded_json<T: DeserializeOwned>(raw: &str) -> ModelOutput<T> {
    let Some(span) = extract_json_object(raw) else {
        return malformed(raw, "no JSON object found");
    };
    match serde_json::from_str::<T>(span) {
        Ok(v) => ModelOutput::Parsed(v),
        Err(e) => {
            tracing::debug!(error = %e, "embedded JSON object did not decode");
            malformed(raw, e.to_string())
        }
    }
}
