use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::command::Stage;
use crate::model::entry::EnrichedRecord;

/// One line of the run ledger.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LedgerEvent {
    pub at: DateTime<Utc>,

    pub stage: Stage,

    pub word: String,

    #[serde(default)]
    pub gloss: String,

    #[serde(default)]
    pub outcome: Outcome,

    #[serde(default)]
    pub detail: String,

    /// Produced record, only on successful enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<EnrichedRecord>,
}

impl LedgerEvent {
    pub fn new(stage: Stage, word: &str, outcome: Outcome, detail: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            stage,
            word: word.to_string(),
            gloss: String::new(),
            outcome,
            detail: detail.into(),
            record: None,
        }
    }

    pub fn with_gloss(mut self, gloss: &str) -> Self {
        self.gloss = gloss.to_string();
        self
    }

    pub fn with_record(mut self, record: EnrichedRecord) -> Self {
        self.record = Some(record);
        self
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    Ok,
    Skipped,
    Failed,
}
