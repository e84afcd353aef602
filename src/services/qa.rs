use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::entry::EnrichedRecord;
use crate::services::deck::note::{is_safe_media_name, sound_refs};

pub const EMPTY_WORD: &str = "EMPTY_WORD";
pub const MISSING_MEANING: &str = "MISSING_MEANING";
pub const DUPLICATE_WORD: &str = "DUPLICATE_WORD";
pub const MISSING_AUDIO_FILE: &str = "MISSING_AUDIO_FILE";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct QaIssue {
    /// 1-based data row, header excluded.
    pub row: usize,
    pub word: String,
    pub code: String,
    pub message: String,
}

impl QaIssue {
    fn new(row: usize, word: &str, code: &str, message: String) -> Self {
        Self {
            row,
            word: word.to_string(),
            code: code.to_string(),
            message,
        }
    }
}

/// Row-level findings for the intermediate table. Audio references are
/// checked against `media_dir`.
pub fn check(records: &[EnrichedRecord], media_dir: &Path) -> Vec<QaIssue> {
    let mut issues: Vec<QaIssue> = Vec::new();
    let mut first_row: HashMap<String, usize> = HashMap::new();

    for (i, r) in records.iter().enumerate() {
        let row = i + 1;
        let word = r.word.trim();

        // Nothing else is meaningful for a row without a word.
        if word.is_empty() {
            issues.push(QaIssue::new(row, word, EMPTY_WORD, "Word is empty".into()));
            continue;
        }

        if r.meaning_en.trim().is_empty() && r.meaning_ar.trim().is_empty() {
            issues.push(QaIssue::new(
                row,
                word,
                MISSING_MEANING,
                "Both Meaning_EN and Meaning_AR are empty".into(),
            ));
        }

        match first_row.get(&word.to_lowercase()) {
            Some(first) => issues.push(QaIssue::new(
                row,
                word,
                DUPLICATE_WORD,
                format!("Same word as row {first}"),
            )),
            None => {
                first_row.insert(word.to_lowercase(), row);
            }
        }

        for field in [&r.sound, &r.example_sound] {
            for file in sound_refs(field) {
                if !is_safe_media_name(&file) || !media_dir.join(&file).exists() {
                    issues.push(QaIssue::new(
                        row,
                        word,
                        MISSING_AUDIO_FILE,
                        format!("{file} is referenced but not in {}", media_dir.display()),
                    ));
                }
            }
        }
    }

    issues
}
