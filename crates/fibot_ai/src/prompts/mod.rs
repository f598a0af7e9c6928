use std::collections::BTreeSet;

use fibot_core::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(String),
}

/// Prompt text with named `{placeholder}` slots. `{{` and `}}` are literal braces.
///
/// The declared placeholder set must match the text exactly, and rendering
/// requires a value for every slot, so a template cannot silently ship with
/// an unfilled or misspelled field.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    name: &'static str,
    segments: Vec<Segment>,
    placeholders: BTreeSet<String>,
}

fn is_slot_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn parse_segments(name: &str, text: &str) -> Result<Vec<Segment>, AppError> {
    let invalid = |why: String| {
        AppError::new("PROMPT_TEMPLATE_INVALID", "Prompt template is malformed")
            .with_details(format!("template={name}; {why}"))
    };

    let mut out = Vec::new();
    let mut lit = String::new();
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                lit.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                lit.push('}');
            }
            '{' => {
                let rest = &text[i + 1..];
                let end = rest
                    .find('}')
                    .ok_or_else(|| invalid(format!("unclosed '{{' at byte {i}")))?;
                let slot = &rest[..end];
                if !is_slot_name(slot) {
                    return Err(invalid(format!("bad placeholder name {slot:?} at byte {i}")));
                }
                if !lit.is_empty() {
                    out.push(Segment::Literal(std::mem::take(&mut lit)));
                }
                out.push(Segment::Slot(slot.to_string()));
                // Skip the name and the closing brace.
                for _ in 0..slot.chars().count() + 1 {
                    chars.next();
                }
            }
            '}' => return Err(invalid(format!("stray '}}' at byte {i}"))),
            _ => lit.push(c),
        }
    }
    if !lit.is_empty() {
        out.push(Segment::Literal(lit));
    }
    Ok(out)
}

impl PromptTemplate {
    pub fn new(name: &'static str, text: &str, declared: &[&str]) -> Result<Self, AppError> {
        let segments = parse_segments(name, text)?;
        let placeholders: BTreeSet<String> = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Slot(n) => Some(n.clone()),
                Segment::Literal(_) => None,
            })
            .collect();
        let declared: BTreeSet<String> = declared.iter().map(|s| s.to_string()).collect();
        if placeholders != declared {
            let missing = declared.difference(&placeholders).cloned().collect::<Vec<_>>();
            let undeclared = placeholders.difference(&declared).cloned().collect::<Vec<_>>();
            return Err(AppError::new(
                "PROMPT_TEMPLATE_INVALID",
                "Prompt template placeholders do not match their declaration",
            )
            .with_details(format!(
                "template={name}; declared_but_absent={missing:?}; used_but_undeclared={undeclared:?}"
            )));
        }
        Ok(Self {
            name,
            segments,
            placeholders,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.placeholders.iter().map(String::as_str)
    }

    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, AppError> {
        for (k, _) in values {
            if !self.placeholders.contains(*k) {
                return Err(AppError::new("PROMPT_RENDER_FAILED", "Unknown prompt placeholder")
                    .with_details(format!("template={}; placeholder={k}", self.name)));
            }
        }
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Slot(n) => {
                    let v = values
                        .iter()
                        .find(|(k, _)| k == n)
                        .map(|(_, v)| *v)
                        .ok_or_else(|| {
                            AppError::new("PROMPT_RENDER_FAILED", "Missing value for prompt placeholder")
                                .with_details(format!("template={}; placeholder={n}", self.name))
                        })?;
                    out.push_str(v);
                }
            }
        }
        Ok(out)
    }
}

pub fn rag_answer() -> Result<PromptTemplate, AppError> {
    PromptTemplate::new(
        "rag_answer_v1",
        "You are a financial assistant. Use ONLY the context below to answer the question.\n\n\
         Context:\n{context}\n\n\
         Question: {question}\nAnswer:",
        &["context", "question"],
    )
}

pub fn advisor_answer() -> Result<PromptTemplate, AppError> {
    PromptTemplate::new(
        "advisor_answer_v1",
        "You are a professional financial advisor. Answer this clearly: {question}",
        &["question"],
    )
}

pub fn nlu_analysis() -> Result<PromptTemplate, AppError> {
    PromptTemplate::new(
        "nlu_analysis_v1",
        r#"You are a financial Natural Language Understanding (NLU) assistant.
Analyze the user's input and return ONLY valid JSON with the following keys:

- intent: string
- entities: list of {{type: string, value: string}}
- sentiment: one of ["positive", "negative", "neutral"]
- categories: list of spending categories (e.g., Food, Rent, Investments)
- amounts: list of {{value: float, currency: string}}
- dates: list of temporal expressions
- notes: list of finance-specific terms (ROI, mutual funds, interest rate, etc.)

Also use this conversation history for context:
{history}

User query: "{query}"

Important:
- Output must be ONLY valid JSON
- No markdown, no explanation, no code fences
"#,
        &["history", "query"],
    )
}

pub fn budget_summary() -> Result<PromptTemplate, AppError> {
    PromptTemplate::new(
        "budget_summary_v1",
        r#"You are a senior financial advisor AI. Analyze this spending by category: {category_totals}
Monthly budget: {total_budget} | Allocation goals (percent): {allocation} | Limits: {limits}
Return ONLY valid JSON with structure:
{{
  "summary": {{
    "needs": {{"spent": number, "limit": number, "status": "ok" or "exceeded"}},
    "wants": {{"spent": number, "limit": number, "status": "ok" or "exceeded"}},
    "savings": {{"spent": number, "limit": number, "status": "ok" or "exceeded"}},
    "investments": {{"spent": number, "limit": number, "status": "ok" or "exceeded"}}
  }},
  "anomalies": ["list of unusual spending spikes"],
  "advice": "Actionable budget optimization advice."
}}
"#,
        &["category_totals", "total_budget", "allocation", "limits"],
    )
}

pub fn spending_trends() -> Result<PromptTemplate, AppError> {
    PromptTemplate::new(
        "spending_trends_v1",
        "Analyze this spending: {records}\n\
         1. Identify trends. 2. Evaluate 'Wants' vs 'Savings'. 3. Predict month-end risk.\n\
         Concise bullet points only.",
        &["records"],
    )
}
