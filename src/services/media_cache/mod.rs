//! Word-keyed record of synthesized audio.
//!
//! The manifest maps (kind, language, normalized text) to a file in the media
//! directory, so an asset is found again even when the file-name derivation
//! changes, and an edited example sentence is detected as stale.

pub mod matcher;
pub mod model;
pub mod naming;
pub mod normalize;
pub mod store;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use model::{MediaKind, MediaRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Recorded in the manifest and present on disk.
    Cached(String),
    /// Present on disk from an earlier run, now recorded.
    Adopted(String),
    /// Must be synthesized into this file.
    Missing(String),
}

impl Resolution {
    pub fn file(&self) -> &str {
        match self {
            Resolution::Cached(f) | Resolution::Adopted(f) | Resolution::Missing(f) => f,
        }
    }
}

pub struct MediaCache {
    dir: PathBuf,
    manifest_path: PathBuf,
    records: Vec<MediaRecord>,
    /// Files resolved or written during this pass.
    claimed: HashSet<String>,
    dirty: bool,
}

impl MediaCache {
    pub fn open(dir: &Path, manifest_path: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest_path: manifest_path.to_path_buf(),
            records: store::load(manifest_path),
            claimed: HashSet::new(),
            dirty: false,
        })
    }

    pub fn path_of(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn records(&self) -> &[MediaRecord] {
        &self.records
    }

    pub fn resolve(&mut self, kind: MediaKind, word: &str, text: &str, lang: &str) -> Resolution {
        let hash = normalize::text_hash(text);

        if let Some(r) = matcher::exact_match(&self.records, kind, lang, &hash) {
            if self.path_of(&r.file).exists() {
                let file = r.file.clone();
                self.claimed.insert(file.clone());
                return Resolution::Cached(file);
            }
        }

        let derived = naming::file_name(word, kind);
        let (file, stale) = match matcher::owner_of(&self.records, &derived) {
            None => (derived, false),
            Some(owner) if owner.key() == (kind, lang, hash.as_str()) => (derived, false),
            // Same asset, different text or language: regenerate in place,
            // unless another row of this pass already uses that file.
            Some(owner) if owner.word == word && owner.kind == kind => {
                if self.claimed.contains(&derived) {
                    (naming::disambiguated_file_name(word, kind, &hash), false)
                } else {
                    (derived, true)
                }
            }
            // Another word sanitizes to the same name.
            Some(_) => (naming::disambiguated_file_name(word, kind, &hash), false),
        };

        if !stale && self.path_of(&file).exists() {
            self.record(kind, word, text, lang, &file);
            return Resolution::Adopted(file);
        }

        Resolution::Missing(file)
    }

    /// Record `file` as the asset for this text, replacing any record with
    /// the same key or the same file.
    pub fn record(&mut self, kind: MediaKind, word: &str, text: &str, lang: &str, file: &str) {
        let rec = MediaRecord {
            kind,
            word: word.to_string(),
            lang: lang.to_string(),
            text: normalize::normalize(text),
            text_hash: normalize::text_hash(text),
            file: file.to_string(),
        };

        self.records
            .retain(|r| r.key() != rec.key() && r.file != rec.file);
        self.claimed.insert(rec.file.clone());
        self.records.push(rec);
        self.dirty = true;
    }

    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        store::save(&self.manifest_path, &self.records)?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(dir: &Path) -> MediaCache {
        MediaCache::open(&dir.join("media"), &dir.join("media").join("manifest.json")).unwrap()
    }

    fn touch(cache: &MediaCache, file: &str) {
        fs::write(cache.path_of(file), b"ID3").unwrap();
    }

    #[test]
    fn unknown_word_is_missing_under_derived_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = cache(dir.path());
        assert_eq!(
            c.resolve(MediaKind::Word, "ice cream", "ice cream", "en"),
            Resolution::Missing("ice_cream.mp3".into())
        );
    }

    #[test]
    fn recorded_asset_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = cache(dir.path());
        touch(&c, "rapid.mp3");
        c.record(MediaKind::Word, "rapid", "rapid", "en", "rapid.mp3");
        assert_eq!(
            c.resolve(MediaKind::Word, "rapid", "rapid", "en"),
            Resolution::Cached("rapid.mp3".into())
        );
    }

    #[test]
    fn existing_file_without_record_is_adopted_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = cache(dir.path());
        touch(&c, "rapid.mp3");
        assert_eq!(
            c.resolve(MediaKind::Word, "rapid", "rapid", "en"),
            Resolution::Adopted("rapid.mp3".into())
        );
        assert_eq!(
            c.resolve(MediaKind::Word, "rapid", "rapid", "en"),
            Resolution::Cached("rapid.mp3".into())
        );
    }

    #[test]
    fn recorded_file_survives_a_naming_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = cache(dir.path());
        touch(&c, "legacy name.mp3");
        c.record(MediaKind::Word, "legacy name", "legacy name", "en", "legacy name.mp3");
        assert_eq!(
            c.resolve(MediaKind::Word, "legacy name", "legacy name", "en"),
            Resolution::Cached("legacy name.mp3".into())
        );
    }

    #[test]
    fn edited_example_is_regenerated_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = cache(dir.path());
        touch(&c, "rapid__ex.mp3");
        c.record(MediaKind::Example, "rapid", "A rapid rise.", "en", "rapid__ex.mp3");
        c.save().unwrap();

        let mut next_run = cache(dir.path());
        assert_eq!(
            next_run.resolve(MediaKind::Example, "rapid", "A rapid decline.", "en"),
            Resolution::Missing("rapid__ex.mp3".into())
        );
    }

    #[test]
    fn duplicate_word_with_other_example_does_not_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = cache(dir.path());

        let first = c.resolve(MediaKind::Example, "rapid", "A rapid rise.", "en");
        assert_eq!(first, Resolution::Missing("rapid__ex.mp3".into()));
        touch(&c, first.file());
        c.record(MediaKind::Example, "rapid", "A rapid rise.", "en", first.file());

        let second = c.resolve(MediaKind::Example, "rapid", "Rapid growth.", "en");
        assert_ne!(second.file(), "rapid__ex.mp3");
        touch(&c, second.file());
        c.record(MediaKind::Example, "rapid", "Rapid growth.", "en", second.file());
        c.save().unwrap();

        let mut again = cache(dir.path());
        assert_eq!(
            again.resolve(MediaKind::Example, "rapid", "A rapid rise.", "en"),
            Resolution::Cached("rapid__ex.mp3".into())
        );
        assert_eq!(
            again.resolve(MediaKind::Example, "rapid", "Rapid growth.", "en"),
            Resolution::Cached(second.file().to_string())
        );
    }

    #[test]
    fn colliding_word_gets_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = cache(dir.path());
        touch(&c, "na_ve.mp3");
        c.record(MediaKind::Word, "naïve", "naïve", "en", "na_ve.mp3");

        let file = match c.resolve(MediaKind::Word, "na ve", "na ve", "en") {
            Resolution::Missing(file) => file,
            other => panic!("expected a fresh file, got {other:?}"),
        };
        assert!(file.starts_with("na_ve-"));
        assert!(file.ends_with(".mp3"));
    }

    #[test]
    fn manifest_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut c = cache(dir.path());
            touch(&c, "rapid.mp3");
            c.record(MediaKind::Word, "rapid", "rapid", "en", "rapid.mp3");
            c.save().unwrap();
        }
        let mut c = cache(dir.path());
        assert_eq!(c.records().len(), 1);
        assert_eq!(
            c.resolve(MediaKind::Word, "rapid", "rapid", "en"),
            Resolution::Cached("rapid.mp3".into())
        );
    }
}
