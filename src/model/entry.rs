use serde::{Deserialize, Serialize};

/// Column order of the intermediate table. Serialization of
/// [`EnrichedRecord`] follows the same order.
pub const COLUMNS: [&str; 14] = [
    "Word",
    "Meaning_EN",
    "Meaning_AR",
    "IPA",
    "Part_of_Speech",
    "Example_EN",
    "Example_AR",
    "Collocations",
    "Synonyms",
    "Antonyms",
    "Notes",
    "Tags",
    "Sound",
    "Example_Sound",
];

/// Fields the model is expected to fill in. `Word`, `Sound` and
/// `Example_Sound` are owned by the pipeline, not the model.
pub const MODEL_FIELDS: [&str; 11] = [
    "Meaning_EN",
    "Meaning_AR",
    "IPA",
    "Part_of_Speech",
    "Example_EN",
    "Example_AR",
    "Collocations",
    "Synonyms",
    "Antonyms",
    "Notes",
    "Tags",
];

/// One row of the input word list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WordEntry {
    pub source_word: String,

    #[serde(default)]
    pub target_gloss: String,
}

impl WordEntry {
    pub fn new(source_word: &str, target_gloss: &str) -> Self {
        Self {
            source_word: source_word.trim().to_string(),
            target_gloss: target_gloss.trim().to_string(),
        }
    }

    pub fn is_processable(&self) -> bool {
        !self.source_word.is_empty()
    }
}

/// One row of the intermediate table.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct EnrichedRecord {
    #[serde(rename = "Word", default)]
    pub word: String,

    #[serde(rename = "Meaning_EN", default)]
    pub meaning_en: String,

    #[serde(rename = "Meaning_AR", default)]
    pub meaning_ar: String,

    #[serde(rename = "IPA", default)]
    pub ipa: String,

    #[serde(rename = "Part_of_Speech", default)]
    pub part_of_speech: String,

    #[serde(rename = "Example_EN", default)]
    pub example_en: String,

    #[serde(rename = "Example_AR", default)]
    pub example_ar: String,

    #[serde(rename = "Collocations", default)]
    pub collocations: String,

    #[serde(rename = "Synonyms", default)]
    pub synonyms: String,

    #[serde(rename = "Antonyms", default)]
    pub antonyms: String,

    #[serde(rename = "Notes", default)]
    pub notes: String,

    #[serde(rename = "Tags", default)]
    pub tags: String,

    #[serde(rename = "Sound", default)]
    pub sound: String,

    #[serde(rename = "Example_Sound", default)]
    pub example_sound: String,
}

impl EnrichedRecord {
    /// Field values in [`COLUMNS`] order.
    pub fn values(&self) -> [&str; 14] {
        [
            &self.word,
            &self.meaning_en,
            &self.meaning_ar,
            &self.ipa,
            &self.part_of_speech,
            &self.example_en,
            &self.example_ar,
            &self.collocations,
            &self.synonyms,
            &self.antonyms,
            &self.notes,
            &self.tags,
            &self.sound,
            &self.example_sound,
        ]
    }

    /// Mutable access by column name, used when applying model output.
    pub fn field_mut(&mut self, column: &str) -> Option<&mut String> {
        let slot = match column {
            "Word" => &mut self.word,
            "Meaning_EN" => &mut self.meaning_en,
            "Meaning_AR" => &mut self.meaning_ar,
            "IPA" => &mut self.ipa,
            "Part_of_Speech" => &mut self.part_of_speech,
            "Example_EN" => &mut self.example_en,
            "Example_AR" => &mut self.example_ar,
            "Collocations" => &mut self.collocations,
            "Synonyms" => &mut self.synonyms,
            "Antonyms" => &mut self.antonyms,
            "Notes" => &mut self.notes,
            "Tags" => &mut self.tags,
            "Sound" => &mut self.sound,
            "Example_Sound" => &mut self.example_sound,
            _ => return None,
        };
        Some(slot)
    }
}

/// Anki audio reference markup for a media file name.
pub fn sound_ref(file_name: &str) -> String {
    format!("[sound:{file_name}]")
}
