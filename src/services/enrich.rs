use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::command::Stage;
use crate::config::Settings;
use crate::error::{PipelineError, Result};
use crate::model::entry::{sound_ref, EnrichedRecord, WordEntry, MODEL_FIELDS};
use crate::model::ledger::{LedgerEvent, Outcome};
use crate::parsers::{table, word_list};
use crate::services::ai::LanguageModel;
use crate::services::ai_types::{EnrichItemResult, EnrichReport};
use crate::services::ledger::Ledger;
use crate::services::media_cache::{model::MediaKind, naming};

pub struct Prompts {
    pub system: String,
    pub user_template: String,
}

impl Prompts {
    pub fn load(system: &Path, user_template: &Path) -> Result<Self> {
        Ok(Self {
            system: read_prompt(system)?,
            user_template: read_prompt(user_template)?,
        })
    }
}

fn read_prompt(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(PipelineError::FileNotFound(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}

/// Substitute `{name}` placeholders. `{{` and `}}` are literal braces;
/// unknown names and stray braces are errors.
pub fn format_template(template: &str, vars: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => {
                            return Err(PipelineError::Template(format!(
                                "unterminated placeholder '{{{name}'"
                            )))
                        }
                        Some(c) => name.push(c),
                    }
                }
                let key = name.trim();
                let value = vars
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| {
                        PipelineError::Template(format!("unknown placeholder '{{{key}}}'"))
                    })?;
                out.push_str(value);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(PipelineError::Template(
                    "single '}' outside a placeholder".into(),
                ))
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

pub fn build_user_prompt(
    template: &str,
    entry: &WordEntry,
    existing: &Map<String, Value>,
) -> Result<String> {
    let existing_fields = serde_json::to_string_pretty(existing)?;
    format_template(
        template,
        &[
            ("word_en", entry.source_word.as_str()),
            ("word_ar", entry.target_gloss.as_str()),
            ("existing_fields", existing_fields.as_str()),
        ],
    )
}

/// Parse the model reply into a JSON object. A Markdown code fence around
/// the object is tolerated.
pub fn parse_reply(word: &str, reply: &str) -> Result<Map<String, Value>> {
    let body = strip_code_fence(reply.trim());

    let value: Value = serde_json::from_str(body)
        .map_err(|e| PipelineError::malformed(word, format!("reply is not JSON: {e}")))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(PipelineError::malformed(
            word,
            format!("expected a JSON object, got {}", json_kind(&other)),
        )),
    }
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop an info string such as `json` on the opening fence.
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Text for one expected field. Missing and null become "", scalar lists
/// are comma-joined, nested objects are rejected.
fn field_text(word: &str, column: &str, value: Option<&Value>) -> Result<String> {
    let Some(value) = value else {
        return Ok(String::new());
    };

    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Array(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) if !s.trim().is_empty() => parts.push(s.trim().to_string()),
                    Value::String(_) | Value::Null => {}
                    Value::Bool(b) => parts.push(b.to_string()),
                    Value::Number(n) => parts.push(n.to_string()),
                    _ => {
                        return Err(PipelineError::malformed(
                            word,
                            format!("field '{column}' holds a nested structure"),
                        ))
                    }
                }
            }
            Ok(parts.join(", "))
        }
        Value::Object(_) => Err(PipelineError::malformed(
            word,
            format!("field '{column}' holds an object"),
        )),
    }
}

fn lookup<'a>(data: &'a Map<String, Value>, column: &str) -> Option<&'a Value> {
    data.get(column).or_else(|| {
        data.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    })
}

/// Apply model output to a fresh record with the full fixed schema.
pub fn build_record(entry: &WordEntry, data: &Map<String, Value>) -> Result<EnrichedRecord> {
    let word = entry.source_word.as_str();
    let mut record = EnrichedRecord {
        word: word.to_string(),
        ..Default::default()
    };

    for column in MODEL_FIELDS {
        let text = field_text(word, column, lookup(data, column))?;
        if let Some(slot) = record.field_mut(column) {
            *slot = text;
        }
    }

    if !entry.target_gloss.is_empty() {
        record.meaning_ar = entry.target_gloss.clone();
    }

    record.sound = sound_ref(&naming::file_name(word, MediaKind::Word));
    record.example_sound = String::new();

    Ok(record)
}

pub fn ask_ai(
    model: &dyn LanguageModel,
    prompts: &Prompts,
    entry: &WordEntry,
    existing: &Map<String, Value>,
) -> Result<EnrichedRecord> {
    let user = build_user_prompt(&prompts.user_template, entry, existing)?;
    let reply = model.complete_json(&prompts.system, &user)?;
    let data = parse_reply(&entry.source_word, &reply)?;
    build_record(entry, &data)
}

/// Enrich every word of the word list and write the table once at the end.
pub fn run(settings: &Settings, model: &dyn LanguageModel, ledger: &Ledger) -> Result<EnrichReport> {
    let paths = settings.paths();
    let entries = word_list::load(&paths.word_list)?;
    let prompts = Prompts::load(&paths.system_prompt, &paths.user_template)?;

    let resumable = if settings.resume {
        ledger.completed_enrichments()?
    } else {
        Default::default()
    };

    log::info!(
        "[enrich] {} rows from {} using {}",
        entries.len(),
        paths.word_list.display(),
        model.name()
    );

    let mut report = EnrichReport::default();
    let mut records = Vec::with_capacity(entries.len());
    let existing = Map::new();

    for entry in &entries {
        if !entry.is_processable() {
            report.skipped_empty += 1;
            continue;
        }

        let key = (entry.source_word.clone(), entry.target_gloss.clone());
        if let Some(record) = resumable.get(&key) {
            log::info!("[enrich] {} (from ledger)", entry.source_word);
            ledger.append(
                &LedgerEvent::new(Stage::Enrich, &entry.source_word, Outcome::Skipped, "resumed")
                    .with_gloss(&entry.target_gloss),
            )?;
            records.push(record.clone());
            report.resumed += 1;
            report.items.push(EnrichItemResult {
                word: entry.source_word.clone(),
                from_ledger: true,
            });
            continue;
        }

        log::info!("[enrich] {}", entry.source_word);
        match ask_ai(model, &prompts, entry, &existing) {
            Ok(record) => {
                ledger.append(
                    &LedgerEvent::new(Stage::Enrich, &entry.source_word, Outcome::Ok, "")
                        .with_gloss(&entry.target_gloss)
                        .with_record(record.clone()),
                )?;
                records.push(record);
                report.enriched += 1;
                report.items.push(EnrichItemResult {
                    word: entry.source_word.clone(),
                    from_ledger: false,
                });
            }
            Err(err) => {
                ledger.append(
                    &LedgerEvent::new(
                        Stage::Enrich,
                        &entry.source_word,
                        Outcome::Failed,
                        err.to_string(),
                    )
                    .with_gloss(&entry.target_gloss),
                )?;
                return Err(err);
            }
        }
    }

    table::write(&paths.enriched, &records)?;
    log::info!(
        "[enrich] wrote {} rows to {} ({} enriched, {} resumed, {} empty skipped)",
        records.len(),
        paths.enriched.display(),
        report.enriched,
        report.resumed,
        report.skipped_empty
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    /// Answers with a fixed entry; the call numbered `garbled_call` gets prose.
    struct CountingModel {
        calls: Cell<usize>,
        garbled_call: Option<usize>,
    }

    impl CountingModel {
        fn new(garbled_call: Option<usize>) -> Self {
            Self {
                calls: Cell::new(0),
                garbled_call,
            }
        }
    }

    impl LanguageModel for CountingModel {
        fn complete_json(&self, _system: &str, _user: &str) -> Result<String> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            if self.garbled_call == Some(n) {
                return Ok("Sorry, I cannot help with that.".into());
            }
            Ok(json!({ "Meaning_EN": "from the model" }).to_string())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn project(words: &str) -> (tempfile::TempDir, Settings) {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::for_root(dir.path());
        let paths = settings.paths();
        fs::create_dir_all(paths.word_list.parent().unwrap()).unwrap();
        fs::write(&paths.word_list, words).unwrap();
        fs::create_dir_all(paths.system_prompt.parent().unwrap()).unwrap();
        fs::write(&paths.system_prompt, "Reply with JSON.").unwrap();
        fs::write(&paths.user_template, "Word: {word_en} ({word_ar})").unwrap();
        (dir, settings)
    }

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn template_substitutes_and_unescapes_braces() {
        let out = format_template(
            "Word: {word_en} ({word_ar})\nReturn {{\"IPA\": \"...\"}}\nKnown: {existing_fields}",
            &[("word_en", "rapid"), ("word_ar", "سريع"), ("existing_fields", "{}")],
        )
        .unwrap();
        assert_eq!(
            out,
            "Word: rapid (سريع)\nReturn {\"IPA\": \"...\"}\nKnown: {}"
        );
    }

    #[test]
    fn template_rejects_unknown_or_broken_placeholders() {
        assert!(matches!(
            format_template("{word}", &[("word_en", "x")]),
            Err(PipelineError::Template(_))
        ));
        assert!(matches!(
            format_template("{word_en", &[("word_en", "x")]),
            Err(PipelineError::Template(_))
        ));
        assert!(matches!(
            format_template("a } b", &[]),
            Err(PipelineError::Template(_))
        ));
    }

    #[test]
    fn user_prompt_embeds_existing_fields_as_json() {
        let entry = WordEntry::new("rapid", "");
        let mut existing = Map::new();
        existing.insert("IPA".into(), json!("/ˈræpɪd/"));
        let out = build_user_prompt("{word_en}|{word_ar}|{existing_fields}", &entry, &existing)
            .unwrap();
        assert!(out.starts_with("rapid||{"));
        assert!(out.contains("\"IPA\": \"/ˈræpɪd/\""));

        let out = build_user_prompt("{existing_fields}", &entry, &Map::new()).unwrap();
        assert_eq!(out, "{}");
    }

    #[test]
    fn reply_must_be_a_json_object() {
        assert!(parse_reply("w", "{\"IPA\": \"x\"}").is_ok());
        assert!(parse_reply("w", "```json\n{\"IPA\": \"x\"}\n```").is_ok());
        assert!(matches!(
            parse_reply("w", "Sure! Here is the entry."),
            Err(PipelineError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_reply("w", "[1, 2]"),
            Err(PipelineError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let entry = WordEntry::new("ubiquitous", "");
        let r = build_record(&entry, &obj(json!({ "Meaning_EN": "found everywhere" }))).unwrap();
        assert_eq!(r.word, "ubiquitous");
        assert_eq!(r.meaning_en, "found everywhere");
        assert_eq!(r.ipa, "");
        assert_eq!(r.notes, "");
        assert_eq!(r.sound, "[sound:ubiquitous.mp3]");
        assert_eq!(r.example_sound, "");
    }

    #[test]
    fn input_gloss_wins_over_model_translation() {
        let data = obj(json!({ "Meaning_AR": "موجود في كل مكان" }));

        let r = build_record(&WordEntry::new("ubiquitous", "منتشر"), &data).unwrap();
        assert_eq!(r.meaning_ar, "منتشر");

        let r = build_record(&WordEntry::new("ubiquitous", ""), &data).unwrap();
        assert_eq!(r.meaning_ar, "موجود في كل مكان");
    }

    #[test]
    fn lists_are_joined_and_objects_rejected() {
        let entry = WordEntry::new("rapid", "");
        let r = build_record(
            &entry,
            &obj(json!({ "Synonyms": ["quick", " fast ", ""], "Tags": null, "IPA": 3 })),
        )
        .unwrap();
        assert_eq!(r.synonyms, "quick, fast");
        assert_eq!(r.tags, "");
        assert_eq!(r.ipa, "3");

        let err = build_record(&entry, &obj(json!({ "Notes": { "text": "x" } }))).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse { .. }));
    }

    #[test]
    fn pipeline_owned_fields_ignore_model_output() {
        let entry = WordEntry::new("rapid", "");
        let r = build_record(
            &entry,
            &obj(json!({ "Word": "RAPID", "Sound": "[sound:x.mp3]", "meaning_en": "fast" })),
        )
        .unwrap();
        assert_eq!(r.word, "rapid");
        assert_eq!(r.sound, "[sound:rapid.mp3]");
        assert_eq!(r.meaning_en, "fast");
    }

    #[test]
    fn resume_reuses_ledger_records_without_calling_the_model() {
        let (_dir, mut settings) = project("word_en,word_ar\nrapid,سريع\n");
        settings.resume = true;
        let paths = settings.paths();
        let ledger = Ledger::new(&paths.ledger);

        let stored = EnrichedRecord {
            word: "rapid".into(),
            meaning_en: "from the ledger".into(),
            ..Default::default()
        };
        ledger
            .append(
                &LedgerEvent::new(Stage::Enrich, "rapid", Outcome::Ok, "")
                    .with_gloss("سريع")
                    .with_record(stored.clone()),
            )
            .unwrap();

        let model = CountingModel::new(None);
        let report = run(&settings, &model, &ledger).unwrap();

        assert_eq!(model.calls.get(), 0);
        assert_eq!(report.resumed, 1);
        assert_eq!(report.enriched, 0);
        assert!(report.items[0].from_ledger);
        assert_eq!(table::read(&paths.enriched).unwrap(), vec![stored]);

        let events = ledger.events().unwrap();
        let last = events.last().unwrap();
        assert_eq!(last.outcome, Outcome::Skipped);
        assert_eq!(last.word, "rapid");
        assert_eq!(last.detail, "resumed");
    }

    #[test]
    fn malformed_reply_aborts_before_the_table_is_written() {
        let (_dir, settings) = project("word_en,word_ar\nrapid,\nslow,\nquiet,\n");
        let paths = settings.paths();
        let ledger = Ledger::new(&paths.ledger);

        let model = CountingModel::new(Some(2));
        let err = run(&settings, &model, &ledger).unwrap_err();

        assert!(matches!(err, PipelineError::MalformedResponse { .. }));
        assert_eq!(model.calls.get(), 2);
        assert!(!paths.enriched.exists());

        let outcomes: Vec<(String, Outcome)> = ledger
            .events()
            .unwrap()
            .into_iter()
            .map(|e| (e.word, e.outcome))
            .collect();
        assert_eq!(
            outcomes,
            vec![("rapid".to_string(), Outcome::Ok), ("slow".to_string(), Outcome::Failed)]
        );
    }
}
