use serde::{Deserialize, Serialize};

/// Request shape used to talk to the model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelVariant {
    /// `/chat/completions` with `response_format: json_object`.
    Chat,
    /// `/responses` with a bounded reasoning effort.
    Reasoning { effort: ReasoningEffort },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(ReasoningEffort::Low),
            "medium" => Some(ReasoningEffort::Medium),
            "high" => Some(ReasoningEffort::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnrichItemResult {
    pub word: String,
    pub from_ledger: bool,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct EnrichReport {
    pub enriched: usize,
    pub resumed: usize,
    pub skipped_empty: usize,
    pub items: Vec<EnrichItemResult>,
}
