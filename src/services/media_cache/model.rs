use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Word,
    Example,
}

/// Manifest entry: which file holds the audio for a given text.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MediaRecord {
    pub kind: MediaKind,

    /// Word the asset belongs to (the example's headword for examples).
    pub word: String,

    pub lang: String,

    pub text: String,

    #[serde(default)]
    pub text_hash: String,

    pub file: String,
}

impl MediaRecord {
    pub fn key(&self) -> (MediaKind, &str, &str) {
        (self.kind, self.lang.as_str(), self.text_hash.as_str())
    }
}
