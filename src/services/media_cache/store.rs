use super::model::{MediaKind, MediaRecord};
use super::normalize;
use crate::error::Result;
use crate::services::atomic;

use std::{collections::HashMap, fs, path::Path};

/// Load the manifest. A missing or unreadable manifest yields an empty one:
/// existing audio files are then adopted again on the next pass.
pub fn load(path: &Path) -> Vec<MediaRecord> {
    if !path.exists() {
        return Vec::new();
    }

    let data = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("[media] failed to read {}: {e}", path.display());
            return Vec::new();
        }
    };

    let mut records: Vec<MediaRecord> = match serde_json::from_str(&data) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("[media] failed to parse {}: {e}", path.display());
            return Vec::new();
        }
    };

    for r in records.iter_mut() {
        ensure_hash(r);
    }

    let (mut records, removed) = dedup(records);
    if removed > 0 {
        log::debug!("[media] dropped {removed} duplicate manifest entries");
    }
    sort_records(&mut records);
    records
}

pub fn save(path: &Path, records: &[MediaRecord]) -> Result<()> {
    let mut v: Vec<MediaRecord> = records.to_vec();

    for r in v.iter_mut() {
        ensure_hash(r);
    }

    let (mut v, _removed) = dedup(v);
    sort_records(&mut v);

    let json = serde_json::to_string_pretty(&v)?;
    atomic::write_atomic(path, json.as_bytes())
}

fn ensure_hash(r: &mut MediaRecord) {
    if r.text_hash.is_empty() {
        r.text_hash = normalize::text_hash(&r.text);
    }
}

/// One record per key; a later record wins.
fn dedup(records: Vec<MediaRecord>) -> (Vec<MediaRecord>, usize) {
    let mut map: HashMap<(MediaKind, String, String), MediaRecord> = HashMap::new();
    let mut removed = 0usize;

    for r in records {
        let key = (r.kind, r.lang.clone(), r.text_hash.clone());
        if map.insert(key, r).is_some() {
            removed += 1;
        }
    }

    (map.into_values().collect(), removed)
}

fn sort_records(records: &mut [MediaRecord]) {
    records.sort_by(|a, b| {
        (a.file.as_str(), a.kind, a.lang.as_str(), a.text_hash.as_str()).cmp(&(
            b.file.as_str(),
            b.kind,
            b.lang.as_str(),
            b.text_hash.as_str(),
        ))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(text: &str, file: &str) -> MediaRecord {
        MediaRecord {
            kind: MediaKind::Word,
            word: text.to_string(),
            lang: "en".into(),
            text: text.to_string(),
            text_hash: String::new(),
            file: file.to_string(),
        }
    }

    #[test]
    fn save_then_load_fills_hashes_dedups_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("media").join("manifest.json");

        save(&path, &[rec("zeta", "zeta.mp3"), rec("alpha", "a.mp3"), rec("alpha", "alpha.mp3")]).unwrap();
        let loaded = load(&path);

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].file, "alpha.mp3");
        assert_eq!(loaded[1].file, "zeta.mp3");
        assert!(loaded.iter().all(|r| r.text_hash.len() == 64));
    }

    #[test]
    fn corrupt_manifest_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(load(&path).is_empty());
    }
}
