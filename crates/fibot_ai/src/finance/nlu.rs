use fibot_core::error::AppError;
use fibot_core::session::SessionContext;
use serde::{Deserialize, Deserializer, Serialize};

use crate::llm::{GenerationParams, Llm};
use crate::output::{parse_fenced_json, ModelOutput};
use crate::prompts;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NluEntity {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NluAmount {
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub currency: String,
}

/// Structured reading of one finance query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NluAnalysis {
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub entities: Vec<NluEntity>,
    #[serde(default = "neutral")]
    pub sentiment: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub amounts: Vec<NluAmount>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub dates: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub notes: Vec<String>,
}

fn neutral() -> String {
    "neutral".to_string()
}

/// Models sometimes send a bare string where a list was asked for.
fn one_or_many<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Nothing(()),
    }
    Ok(match OneOrMany::deserialize(d)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Nothing(()) => Vec::new(),
    })
}

#[derive(Debug, Clone)]
pub struct NluOutcome {
    pub query: String,
    pub analysis: ModelOutput<NluAnalysis>,
}

/// Analyze `query` with the running session context. Only a parsed analysis is
/// appended to the context.
pub fn analyze_query(
    llm: &dyn Llm,
    model: &str,
    session: &mut SessionContext,
    query: &str,
) -> Result<NluOutcome, AppError> {
    let q = query.trim();
    if q.is_empty() {
        return Err(AppError::new("VALIDATION_QUERY", "Please enter a query before analyzing"));
    }
    let prompt = prompts::nlu_analysis()?.render(&[("history", session.nlu_context()), ("query", q)])?;
    let raw = llm.generate(model, &prompt, &GenerationParams::STRUCTURED)?;

    let analysis: ModelOutput<NluAnalysis> = parse_fenced_json(&raw);
    if let ModelOutput::Parsed(a) = &analysis {
        let json = serde_json::to_string(a).map_err(|e| {
            AppError::new("AI_LLM_FAILED", "Failed to encode NLU analysis").with_details(e.to_string())
        })?;
        session.append_nlu_turn(q, &json);
    } else {
        tracing::warn!(model, "NLU reply was not valid JSON");
    }
    Ok(NluOutcome {
        query: q.to_string(),
        analysis,
    })
}
