use super::model::{MediaKind, MediaRecord};

/// Exact lookup by (kind, language, normalized-text hash).
pub fn exact_match<'a>(
    records: &'a [MediaRecord],
    kind: MediaKind,
    lang: &str,
    text_hash: &str,
) -> Option<&'a MediaRecord> {
    records
        .iter()
        .find(|r| r.key() == (kind, lang, text_hash))
}

/// The record currently owning a file name, if any.
pub fn owner_of<'a>(records: &'a [MediaRecord], file: &str) -> Option<&'a MediaRecord> {
    records.iter().find(|r| r.file == file)
}
