use regex::Regex;
use std::sync::OnceLock;

use super::model::MediaKind;

/// Longest file token derived from a word.
pub const MAX_TOKEN_LEN: usize = 80;

pub const EXAMPLE_SUFFIX: &str = "__ex";

pub const AUDIO_EXT: &str = "mp3";

fn disallowed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_+\-]+").unwrap())
}

/// Filesystem-safe token for a word: each run of characters outside
/// `[A-Za-z0-9_+-]` becomes one `_`, capped at [`MAX_TOKEN_LEN`].
pub fn sanitize(word: &str) -> String {
    let mut token = disallowed().replace_all(word, "_").into_owned();
    // Only ASCII survives the replacement, so byte truncation is safe.
    token.truncate(MAX_TOKEN_LEN);
    token
}

pub fn file_name(word: &str, kind: MediaKind) -> String {
    let token = sanitize(word);
    match kind {
        MediaKind::Word => format!("{token}.{AUDIO_EXT}"),
        MediaKind::Example => format!("{token}{EXAMPLE_SUFFIX}.{AUDIO_EXT}"),
    }
}

/// Name used when the derived name already belongs to a different word.
pub fn disambiguated_file_name(word: &str, kind: MediaKind, text_hash: &str) -> String {
    let tag: String = text_hash.chars().take(8).collect();
    let token = sanitize(word);
    match kind {
        MediaKind::Word => format!("{token}-{tag}.{AUDIO_EXT}"),
        MediaKind::Example => format!("{token}-{tag}{EXAMPLE_SUFFIX}.{AUDIO_EXT}"),
    }
}
