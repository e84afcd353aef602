//! `.apkg` serialization: a zip holding `collection.anki2` (SQLite,
//! schema 11), the `media` index and the numbered media files.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use serde_json::{json, Value};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::note::DeckNote;
use super::note_type::NoteType;
use super::template::CardRenderer;
use crate::error::Result;
use crate::services::atomic;

const SCHEMA: &str = r#"
CREATE TABLE col (
    id      integer primary key,
    crt     integer not null,
    mod     integer not null,
    scm     integer not null,
    ver     integer not null,
    dty     integer not null,
    usn     integer not null,
    ls      integer not null,
    conf    text not null,
    models  text not null,
    decks   text not null,
    dconf   text not null,
    tags    text not null
);
CREATE TABLE notes (
    id      integer primary key,
    guid    text not null,
    mid     integer not null,
    mod     integer not null,
    usn     integer not null,
    tags    text not null,
    flds    text not null,
    sfld    integer not null,
    csum    integer not null,
    flags   integer not null,
    data    text not null
);
CREATE TABLE cards (
    id      integer primary key,
    nid     integer not null,
    did     integer not null,
    ord     integer not null,
    mod     integer not null,
    usn     integer not null,
    type    integer not null,
    queue   integer not null,
    due     integer not null,
    ivl     integer not null,
    factor  integer not null,
    reps    integer not null,
    lapses  integer not null,
    left    integer not null,
    odue    integer not null,
    odid    integer not null,
    flags   integer not null,
    data    text not null
);
CREATE TABLE revlog (
    id      integer primary key,
    cid     integer not null,
    usn     integer not null,
    ease    integer not null,
    ivl     integer not null,
    lastIvl integer not null,
    factor  integer not null,
    time    integer not null,
    type    integer not null
);
CREATE TABLE graves (
    usn     integer not null,
    oid     integer not null,
    type    integer not null
);
CREATE INDEX ix_notes_usn ON notes (usn);
CREATE INDEX ix_cards_usn ON cards (usn);
CREATE INDEX ix_revlog_usn ON revlog (usn);
CREATE INDEX ix_cards_nid ON cards (nid);
CREATE INDEX ix_cards_sched ON cards (did, queue, due);
CREATE INDEX ix_revlog_cid ON revlog (cid);
CREATE INDEX ix_notes_csum ON notes (csum);
"#;

const SCHEMA_VERSION: i64 = 11;

/// Deck identity inside the collection.
#[derive(Debug, Clone)]
pub struct DeckInfo {
    pub id: i64,
    pub name: String,
}

/// A media file to embed under its deck-visible name.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PackageStats {
    pub notes: usize,
    pub cards: usize,
    pub media: usize,
}

/// Write the package to a sibling temporary file, then move it over `path`.
pub fn write_package(
    path: &Path,
    deck: &DeckInfo,
    note_type: &NoteType,
    notes: &[DeckNote],
    media: &[MediaFile],
) -> Result<PackageStats> {
    let work = tempfile::tempdir()?;
    let collection = work.path().join("collection.anki2");
    let stats = write_collection(&collection, deck, note_type, notes)?;

    let mut tmp = atomic::staging_file(path)?;
    write_zip(tmp.as_file_mut(), &collection, media)?;
    atomic::commit(tmp, path)?;

    Ok(PackageStats {
        media: media.len(),
        ..stats
    })
}

fn write_zip(out: &mut File, collection: &Path, media: &[MediaFile]) -> Result<()> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(out);

    zip.start_file("collection.anki2", options)?;
    zip.write_all(&fs::read(collection)?)?;

    let index: BTreeMap<String, &str> = media
        .iter()
        .enumerate()
        .map(|(i, m)| (i.to_string(), m.name.as_str()))
        .collect();
    zip.start_file("media", options)?;
    zip.write_all(serde_json::to_string(&index)?.as_bytes())?;

    for (i, m) in media.iter().enumerate() {
        zip.start_file(i.to_string(), options)?;
        zip.write_all(&fs::read(&m.path)?)?;
    }

    zip.finish()?;
    Ok(())
}

fn write_collection(
    path: &Path,
    deck: &DeckInfo,
    note_type: &NoteType,
    notes: &[DeckNote],
) -> Result<PackageStats> {
    let now = chrono::Utc::now();
    let now_ms = now.timestamp_millis();
    let now_s = now.timestamp();

    let renderer = CardRenderer::new();
    let mut conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;

    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO col VALUES (1, ?1, ?2, ?3, ?4, 0, 0, 0, ?5, ?6, ?7, ?8, '{}')",
        params![
            now_s,
            now_ms,
            now_ms,
            SCHEMA_VERSION,
            collection_conf(deck.id).to_string(),
            json!({ note_type.id.to_string(): note_type.to_json(&renderer, deck.id, now_s)? }).to_string(),
            decks_json(deck, now_s).to_string(),
            dconf_json().to_string(),
        ],
    )?;

    let mut stats = PackageStats::default();
    let mut card_id = now_ms;

    for (i, note) in notes.iter().enumerate() {
        let note_id = now_ms + i as i64;
        tx.execute(
            "INSERT INTO notes VALUES (?1, ?2, ?3, ?4, -1, ?5, ?6, ?7, ?8, 0, '')",
            params![
                note_id,
                note.guid,
                note_type.id,
                now_s,
                note.tags_column(),
                note.joined_fields(),
                note.sort_field(),
                note.checksum(),
            ],
        )?;
        stats.notes += 1;

        let fields = note.field_map();
        for (ord, tmpl) in note_type.templates.iter().enumerate() {
            if !renderer.generates_card(tmpl.qfmt, &fields)? {
                continue;
            }
            tx.execute(
                "INSERT INTO cards VALUES (?1, ?2, ?3, ?4, ?5, -1, 0, 0, ?6, 0, 0, 0, 0, 0, 0, 0, 0, '')",
                params![card_id, note_id, deck.id, ord as i64, now_s, i as i64],
            )?;
            card_id += 1;
            stats.cards += 1;
        }
    }

    tx.commit()?;
    Ok(stats)
}

fn collection_conf(deck_id: i64) -> Value {
    json!({
        "activeDecks": [deck_id],
        "curDeck": deck_id,
        "newSpread": 0,
        "collapseTime": 1200,
        "timeLim": 0,
        "estTimes": true,
        "dueCounts": true,
        "curModel": null,
        "nextPos": 1,
        "sortType": "noteFld",
        "sortBackwards": false,
        "addToCur": true,
    })
}

fn deck_json(id: i64, name: &str, modified: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "desc": "",
        "mod": modified,
        "usn": -1,
        "dyn": 0,
        "conf": 1,
        "collapsed": false,
        "extendNew": 10,
        "extendRev": 50,
        "newToday": [0, 0],
        "revToday": [0, 0],
        "lrnToday": [0, 0],
        "timeToday": [0, 0],
    })
}

fn decks_json(deck: &DeckInfo, modified: i64) -> Value {
    json!({
        "1": deck_json(1, "Default", modified),
        deck.id.to_string(): deck_json(deck.id, &deck.name, modified),
    })
}

fn dconf_json() -> Value {
    json!({
        "1": {
            "id": 1,
            "name": "Default",
            "mod": 0,
            "usn": 0,
            "maxTaken": 60,
            "autoplay": true,
            "timer": 0,
            "replayq": true,
            "dyn": false,
            "new": {
                "delays": [1, 10],
                "ints": [1, 4, 7],
                "initialFactor": 2500,
                "order": 1,
                "perDay": 20,
                "bury": true,
                "separate": true,
            },
            "lapse": {
                "delays": [10],
                "mult": 0,
                "minInt": 1,
                "leechFails": 8,
                "leechAction": 0,
            },
            "rev": {
                "perDay": 100,
                "ease4": 1.3,
                "fuzz": 0.05,
                "ivlFct": 1,
                "maxIvl": 36500,
                "minSpace": 1,
                "bury": true,
            },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::EnrichedRecord;
    use crate::services::deck::note_type::{DECK_ID, DECK_NAME};
    use std::io::Read;

    fn deck() -> DeckInfo {
        DeckInfo {
            id: DECK_ID,
            name: DECK_NAME.to_string(),
        }
    }

    fn note(word: &str, meaning: &str) -> DeckNote {
        DeckNote::from_record(&EnrichedRecord {
            word: word.into(),
            meaning_en: meaning.into(),
            sound: format!("[sound:{word}.mp3]"),
            ..Default::default()
        })
    }

    #[test]
    fn package_holds_collection_media_index_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("rapid.mp3");
        fs::write(&audio, b"ID3 rapid").unwrap();
        let out = dir.path().join("out").join("deck.apkg");

        let stats = write_package(
            &out,
            &deck(),
            &NoteType::vocab(),
            &[note("rapid", "fast"), note("slow", "")],
            &[MediaFile {
                name: "rapid.mp3".into(),
                path: audio,
            }],
        )
        .unwrap();

        // "slow" has no meaning, so only its first card exists.
        assert_eq!(stats, PackageStats { notes: 2, cards: 3, media: 1 });
        let leftovers: Vec<_> = fs::read_dir(out.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("deck.apkg")]);

        let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let mut index = String::new();
        archive.by_name("media").unwrap().read_to_string(&mut index).unwrap();
        assert_eq!(index, r#"{"0":"rapid.mp3"}"#);

        let mut bytes = Vec::new();
        archive.by_name("0").unwrap().read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, b"ID3 rapid");

        let db_path = dir.path().join("collection.anki2");
        let mut db = Vec::new();
        archive
            .by_name("collection.anki2")
            .unwrap()
            .read_to_end(&mut db)
            .unwrap();
        fs::write(&db_path, db).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let (flds, mid): (String, i64) = conn
            .query_row("SELECT flds, mid FROM notes ORDER BY id LIMIT 1", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert!(flds.starts_with("rapid\x1ffast\x1f"));
        assert_eq!(mid, NoteType::vocab().id);

        let models: String = conn
            .query_row("SELECT models FROM col", [], |r| r.get(0))
            .unwrap();
        let models: Value = serde_json::from_str(&models).unwrap();
        assert_eq!(
            models[NoteType::vocab().id.to_string()]["name"],
            "Vocab EN-AR Model v2"
        );
    }

    #[test]
    fn rewrite_replaces_previous_package() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("deck.apkg");
        fs::write(&out, b"stale").unwrap();

        write_package(&out, &deck(), &NoteType::vocab(), &[note("rapid", "fast")], &[]).unwrap();

        let archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
    }
}
