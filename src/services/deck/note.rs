use std::sync::OnceLock;

use regex::Regex;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::chips::{chip_field, escape_html};
use super::template::FieldMap;
use crate::model::entry::{EnrichedRecord, COLUMNS};

const BASE91: &[u8; 91] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!#$%&()*+,-./:;<=>?@[]^_`{|}~";

const CHIP_FIELDS: [&str; 3] = ["Collocations", "Synonyms", "Antonyms"];
const SOUND_FIELDS: [&str; 2] = ["Sound", "Example_Sound"];

/// One note of the deck, fields already rendered to card HTML.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckNote {
    pub guid: String,
    pub fields: Vec<String>,
    pub tags: Vec<String>,
}

impl DeckNote {
    pub fn from_record(record: &EnrichedRecord) -> Self {
        Self::from_occurrence(record, 0)
    }

    /// `occurrence` counts earlier rows with the same word, so repeated
    /// words still get distinct GUIDs.
    pub fn from_occurrence(record: &EnrichedRecord, occurrence: usize) -> Self {
        let fields = COLUMNS
            .iter()
            .zip(record.values())
            .map(|(column, value)| field_html(column, value))
            .collect();

        Self {
            guid: note_guid(record.word.trim(), occurrence),
            fields,
            tags: split_tags(&record.tags),
        }
    }

    pub fn field_map(&self) -> FieldMap {
        COLUMNS
            .iter()
            .zip(&self.fields)
            .map(|(c, v)| (c.to_string(), v.clone()))
            .collect()
    }

    /// `flds` column: fields joined by the unit separator.
    pub fn joined_fields(&self) -> String {
        self.fields.join("\x1f")
    }

    /// Sort field: the first field without markup.
    pub fn sort_field(&self) -> String {
        self.fields.first().map(|f| strip_html(f)).unwrap_or_default()
    }

    pub fn checksum(&self) -> i64 {
        field_checksum(&self.sort_field())
    }

    /// `tags` column: space separated with a leading and trailing space.
    pub fn tags_column(&self) -> String {
        if self.tags.is_empty() {
            String::new()
        } else {
            format!(" {} ", self.tags.join(" "))
        }
    }

    /// Media files named by `[sound:...]` references, first occurrence order.
    pub fn sound_files(&self) -> Vec<String> {
        let mut files: Vec<String> = Vec::new();
        for field in &self.fields {
            for name in sound_refs(field) {
                if !files.contains(&name) {
                    files.push(name);
                }
            }
        }
        files
    }
}

/// A plain file name that cannot leave the media directory.
pub fn is_safe_media_name(name: &str) -> bool {
    !name.contains('/') && !name.contains('\\') && !name.contains("..")
}

/// File names inside `[sound:...]` markup.
pub fn sound_refs(text: &str) -> Vec<String> {
    sound_re()
        .captures_iter(text)
        .map(|cap| cap[1].trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

fn field_html(column: &str, value: &str) -> String {
    if SOUND_FIELDS.contains(&column) {
        value.trim().to_string()
    } else if CHIP_FIELDS.contains(&column) {
        chip_field(value)
    } else if column == "Notes" {
        escape_html(value.trim())
            .replace("\r\n", "\n")
            .replace('\n', "<br>")
    } else {
        escape_html(value.trim())
    }
}

fn sound_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[sound:([^\]]+)\]").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

/// Tags split on commas and whitespace, duplicates dropped.
pub fn split_tags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in text.split(|c: char| c == ',' || c.is_whitespace()) {
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

pub fn strip_html(html: &str) -> String {
    tag_re()
        .replace_all(html, "")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#x60;", "`")
        .replace("&#x3D;", "=")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// First 32 bits of the SHA-1 of the sort field, as Anki stores it.
pub fn field_checksum(text: &str) -> i64 {
    let digest = Sha1::digest(text.as_bytes());
    let mut head = [0u8; 4];
    head.copy_from_slice(&digest[..4]);
    i64::from(u32::from_be_bytes(head))
}

/// The first row of a word keys on the word alone.
pub fn note_guid(word: &str, occurrence: usize) -> String {
    if occurrence == 0 {
        guid_for(word)
    } else {
        guid_for(&format!("{word}\x1f{occurrence}"))
    }
}

/// Stable note GUID: base91 of the first 64 bits of SHA-256 of `key`.
pub fn guid_for(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let mut n = u64::from_be_bytes(head);

    if n == 0 {
        return (BASE91[0] as char).to_string();
    }

    let mut out = Vec::new();
    while n > 0 {
        out.push(BASE91[(n % 91) as usize]);
        n /= 91;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
