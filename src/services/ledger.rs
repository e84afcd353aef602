use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::command::Stage;
use crate::error::Result;
use crate::model::entry::EnrichedRecord;
use crate::model::ledger::{LedgerEvent, Outcome};

pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn append(&self, event: &LedgerEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// All readable events in file order. Lines that fail to parse (a torn
    /// final write, hand edits) are skipped.
    pub fn events(&self) -> Result<Vec<LedgerEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let data = fs::read_to_string(&self.path)?;
        let mut events = Vec::new();
        for (i, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LedgerEvent>(line) {
                Ok(e) => events.push(e),
                Err(e) => log::warn!("[ledger] skipping line {}: {e}", i + 1),
            }
        }
        Ok(events)
    }

    /// Latest successful enrichment per (word, gloss).
    pub fn completed_enrichments(&self) -> Result<HashMap<(String, String), EnrichedRecord>> {
        let mut done = HashMap::new();
        for e in self.events()? {
            if e.stage != Stage::Enrich || e.outcome != Outcome::Ok {
                continue;
            }
            if let Some(record) = e.record {
                done.insert((e.word, e.gloss), record);
            }
        }
        Ok(done)
    }
}
