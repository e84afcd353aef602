use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::model::entry::WordEntry;
use crate::services::encoding;

const WORD_COLUMN: &str = "word_en";
const GLOSS_COLUMN: &str = "word_ar";

/// Load the input word list. Rows keep their file order; rows with an empty
/// word are returned too and filtered by the caller.
pub fn load(path: &Path) -> Result<Vec<WordEntry>> {
    let decoded = encoding::read_text(path)?;
    if decoded.had_errors {
        log::warn!(
            "{} decoded as {} with replacement characters",
            path.display(),
            decoded.encoding
        );
    } else {
        log::debug!("{} decoded as {}", path.display(), decoded.encoding);
    }
    parse(&decoded.text)
}

pub fn parse(text: &str) -> Result<Vec<WordEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(encoding::strip_bom(text).as_bytes());

    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let word_idx = position(WORD_COLUMN).ok_or_else(|| {
        PipelineError::InvalidInput(format!("word list has no '{WORD_COLUMN}' column"))
    })?;
    let gloss_idx = position(GLOSS_COLUMN);

    let mut entries = Vec::new();
    for row in reader.records() {
        let row = row?;
        let word = row.get(word_idx).unwrap_or("");
        let gloss = gloss_idx.and_then(|i| row.get(i)).unwrap_or("");
        entries.push(WordEntry::new(word, gloss));
    }

    Ok(entries)
}
