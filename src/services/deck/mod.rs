pub mod apkg;
pub mod chips;
pub mod note;
pub mod note_type;
pub mod template;

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::command::Stage;
use crate::config::Settings;
use crate::error::Result;
use crate::model::ledger::{LedgerEvent, Outcome};
use crate::parsers::table;
use crate::services::ledger::Ledger;
use crate::services::qa;
use apkg::{DeckInfo, MediaFile};
use note::{is_safe_media_name, DeckNote};
use note_type::{NoteType, DECK_ID, DECK_NAME};

#[derive(Debug, Default, Serialize)]
pub struct PackageReport {
    pub notes: usize,
    pub cards: usize,
    pub media: usize,
    pub skipped_rows: usize,
    pub missing_media: usize,
}

pub fn run(settings: &Settings, ledger: &Ledger) -> Result<PackageReport> {
    let paths = settings.paths();
    let records = table::read(&paths.enriched)?;
    log::info!(
        "[build] {} rows from {}",
        records.len(),
        paths.enriched.display()
    );

    for issue in qa::check(&records, &paths.media_dir) {
        if issue.code != qa::EMPTY_WORD {
            log::warn!("[build] row {} ({}): {} {}", issue.row, issue.word, issue.code, issue.message);
        }
    }

    let mut report = PackageReport::default();
    let mut notes = Vec::with_capacity(records.len());
    let mut media: Vec<MediaFile> = Vec::new();
    let mut attached: HashSet<String> = HashSet::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (i, record) in records.iter().enumerate() {
        if record.word.trim().is_empty() {
            log::warn!("[build] row {} skipped: empty word", i + 1);
            report.skipped_rows += 1;
            ledger.append(&LedgerEvent::new(
                Stage::Package,
                "",
                Outcome::Skipped,
                format!("row {} has no word", i + 1),
            ))?;
            continue;
        }

        let occurrence = seen.entry(record.word.trim().to_string()).or_insert(0);
        let note = DeckNote::from_occurrence(record, *occurrence);
        *occurrence += 1;

        for file in note.sound_files() {
            if attached.contains(&file) {
                continue;
            }
            if !is_safe_media_name(&file) {
                log::warn!("[build] {}: refusing media name {file:?}", record.word.trim());
                report.missing_media += 1;
                continue;
            }
            let path = paths.media_dir.join(&file);
            if path.exists() {
                attached.insert(file.clone());
                media.push(MediaFile { name: file, path });
            } else {
                log::warn!("[build] {}: missing audio {file}", record.word.trim());
                report.missing_media += 1;
            }
        }

        ledger.append(&LedgerEvent::new(
            Stage::Package,
            record.word.trim(),
            Outcome::Ok,
            note.guid.clone(),
        ))?;
        notes.push(note);
    }

    let deck = DeckInfo {
        id: DECK_ID,
        name: DECK_NAME.to_string(),
    };
    let stats = apkg::write_package(&paths.deck, &deck, &NoteType::vocab(), &notes, &media)?;

    report.notes = stats.notes;
    report.cards = stats.cards;
    report.media = stats.media;

    log::info!(
        "[build] wrote {} ({} notes, {} cards, {} media files)",
        paths.deck.display(),
        report.notes,
        report.cards,
        report.media
    );

    Ok(report)
}
