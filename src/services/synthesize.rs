use std::collections::HashMap;

use serde::Serialize;

use crate::command::Stage;
use crate::config::Settings;
use crate::error::Result;
use crate::model::entry::{sound_ref, EnrichedRecord};
use crate::model::ledger::{LedgerEvent, Outcome};
use crate::parsers::table;
use crate::services::ledger::Ledger;
use crate::services::media_cache::{model::MediaKind, MediaCache, Resolution};
use crate::services::tts::SpeechSynthesizer;

#[derive(Debug, Default, Serialize)]
pub struct SynthReport {
    pub created: usize,
    pub cached: usize,
    pub adopted: usize,
    pub rows_updated: usize,
    pub table_updated: bool,
}

struct Pass<'a> {
    cache: MediaCache,
    tts: &'a dyn SpeechSynthesizer,
    ledger: &'a Ledger,
    lang: &'a str,
    report: SynthReport,
}

impl Pass<'_> {
    fn ensure(&mut self, kind: MediaKind, word: &str, text: &str) -> Result<String> {
        let resolution = self.cache.resolve(kind, word, text, self.lang);

        let (file, outcome, detail) = match resolution {
            Resolution::Cached(file) => {
                log::debug!("[tts] cached {file}");
                self.report.cached += 1;
                let detail = format!("cached {file}");
                (file, Outcome::Skipped, detail)
            }
            Resolution::Adopted(file) => {
                log::info!("[tts] adopted existing {file}");
                self.report.adopted += 1;
                let detail = format!("adopted {file}");
                (file, Outcome::Skipped, detail)
            }
            Resolution::Missing(file) => {
                log::info!("[tts] {word} -> {file}");
                let path = self.cache.path_of(&file);
                if let Err(err) = self.tts.synthesize_to_file(text, self.lang, &path) {
                    self.ledger.append(&LedgerEvent::new(
                        Stage::Synthesize,
                        word,
                        Outcome::Failed,
                        format!("{file}: {err}"),
                    ))?;
                    return Err(err);
                }
                self.cache.record(kind, word, text, self.lang, &file);
                self.report.created += 1;
                let detail = format!("created {file}");
                (file, Outcome::Ok, detail)
            }
        };

        self.ledger
            .append(&LedgerEvent::new(Stage::Synthesize, word, outcome, detail))?;
        Ok(file)
    }

    fn process(&mut self, records: &mut [EnrichedRecord]) -> Result<()> {
        let mut word_files: HashMap<String, String> = HashMap::new();

        for record in records.iter_mut() {
            let word = record.word.trim().to_string();
            if word.is_empty() {
                continue;
            }

            let word_file = match word_files.get(&word) {
                Some(file) => file.clone(),
                None => {
                    let file = self.ensure(MediaKind::Word, &word, &word)?;
                    word_files.insert(word.clone(), file.clone());
                    file
                }
            };

            let example = record.example_en.trim().to_string();
            let example_sound = if example.is_empty() {
                String::new()
            } else {
                sound_ref(&self.ensure(MediaKind::Example, &word, &example)?)
            };

            let sound = sound_ref(&word_file);
            if record.sound != sound || record.example_sound != example_sound {
                record.sound = sound;
                record.example_sound = example_sound;
                self.report.rows_updated += 1;
            }
        }

        Ok(())
    }
}

/// Ensure audio for every row and reconcile `Sound` / `Example_Sound`.
///
/// The manifest is saved even when synthesis fails part way, so completed
/// files are not requested again on the next run.
pub fn run(settings: &Settings, tts: &dyn SpeechSynthesizer, ledger: &Ledger) -> Result<SynthReport> {
    let paths = settings.paths();
    let mut records = table::read(&paths.enriched)?;

    log::info!(
        "[tts] {} rows from {} using {} ({})",
        records.len(),
        paths.enriched.display(),
        tts.name(),
        settings.tts_lang
    );

    let mut pass = Pass {
        cache: MediaCache::open(&paths.media_dir, &paths.manifest)?,
        tts,
        ledger,
        lang: &settings.tts_lang,
        report: SynthReport::default(),
    };

    let processed = pass.process(&mut records);
    let saved = pass.cache.save();
    processed?;
    saved?;

    let mut report = pass.report;
    if report.rows_updated > 0 {
        table::write(&paths.enriched, &records)?;
        report.table_updated = true;
    }

    log::info!(
        "[tts] done: {} created, {} cached, {} adopted, {} rows updated",
        report.created,
        report.cached,
        report.adopted,
        report.rows_updated
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::cell::Cell;
    use std::fs;
    use std::path::Path;

    struct FakeTts {
        calls: Cell<usize>,
        fail_on: Option<&'static str>,
    }

    impl FakeTts {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
                fail_on: None,
            }
        }
    }

    impl SpeechSynthesizer for FakeTts {
        fn synthesize(&self, text: &str, _lang: &str) -> Result<Vec<u8>> {
            if self.fail_on == Some(text) {
                return Err(PipelineError::remote("speech synthesis", "HTTP 503"));
            }
            self.calls.set(self.calls.get() + 1);
            Ok(format!("ID3 {text}").into_bytes())
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn row(word: &str, example: &str) -> EnrichedRecord {
        EnrichedRecord {
            word: word.into(),
            example_en: example.into(),
            sound: format!("[sound:{word}.mp3]"),
            ..Default::default()
        }
    }

    fn setup(dir: &Path, rows: &[EnrichedRecord]) -> (Settings, Ledger) {
        let settings = Settings::for_root(dir);
        let paths = settings.paths();
        table::write(&paths.enriched, rows).unwrap();
        let ledger = Ledger::new(&paths.ledger);
        (settings, ledger)
    }

    #[test]
    fn creates_audio_and_backfills_example_sound() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, ledger) = setup(
            dir.path(),
            &[row("rapid", "A rapid rise."), row("slow", "")],
        );
        let tts = FakeTts::new();

        let report = run(&settings, &tts, &ledger).unwrap();
        assert_eq!(report.created, 3);
        assert!(report.table_updated);

        let paths = settings.paths();
        assert!(paths.media_dir.join("rapid.mp3").exists());
        assert!(paths.media_dir.join("rapid__ex.mp3").exists());
        assert!(paths.media_dir.join("slow.mp3").exists());
        assert!(!paths.media_dir.join("slow__ex.mp3").exists());

        let rows = table::read(&paths.enriched).unwrap();
        assert_eq!(rows[0].example_sound, "[sound:rapid__ex.mp3]");
        assert_eq!(rows[1].example_sound, "");
    }

    #[test]
    fn second_run_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, ledger) = setup(dir.path(), &[row("rapid", "A rapid rise.")]);
        let tts = FakeTts::new();

        run(&settings, &tts, &ledger).unwrap();
        let table_before = fs::read(settings.paths().enriched).unwrap();

        let report = run(&settings, &tts, &ledger).unwrap();
        assert_eq!(tts.calls.get(), 2);
        assert_eq!(report.created, 0);
        assert_eq!(report.cached, 2);
        assert!(!report.table_updated);
        assert_eq!(fs::read(settings.paths().enriched).unwrap(), table_before);
    }

    #[test]
    fn duplicate_words_share_word_audio() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, ledger) = setup(
            dir.path(),
            &[row("rapid", "A rapid rise."), row("rapid", "Rapid growth.")],
        );
        let tts = FakeTts::new();

        let report = run(&settings, &tts, &ledger).unwrap();
        assert_eq!(report.created, 3);

        let rows = table::read(&settings.paths().enriched).unwrap();
        assert_eq!(rows[0].sound, rows[1].sound);
        assert_ne!(rows[0].example_sound, rows[1].example_sound);
    }

    #[test]
    fn failure_keeps_completed_assets_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, ledger) = setup(
            dir.path(),
            &[row("rapid", "A rapid rise."), row("slow", "")],
        );
        let tts = FakeTts {
            calls: Cell::new(0),
            fail_on: Some("slow"),
        };

        let err = run(&settings, &tts, &ledger).unwrap_err();
        assert!(matches!(err, PipelineError::RemoteApi { .. }));

        let manifest = fs::read_to_string(settings.paths().manifest).unwrap();
        assert!(manifest.contains("rapid__ex.mp3"));

        let events = ledger.events().unwrap();
        assert_eq!(events.last().unwrap().outcome, Outcome::Failed);

        let retry = FakeTts::new();
        let report = run(&settings, &retry, &ledger).unwrap();
        assert_eq!(retry.calls.get(), 1);
        assert_eq!(report.cached, 2);
    }

    #[test]
    fn missing_table_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::for_root(dir.path());
        let ledger = Ledger::new(&settings.paths().ledger);
        assert!(matches!(
            run(&settings, &FakeTts::new(), &ledger),
            Err(PipelineError::FileNotFound(_))
        ));
    }
}
