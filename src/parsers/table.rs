use std::fs;
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::model::entry::{EnrichedRecord, COLUMNS};
use crate::services::{atomic, encoding};

const UTF8_BOM: &str = "\u{feff}";

pub fn read(path: &Path) -> Result<Vec<EnrichedRecord>> {
    if !path.exists() {
        return Err(PipelineError::FileNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    parse(&text)
}

pub fn parse(text: &str) -> Result<Vec<EnrichedRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(encoding::strip_bom(text).as_bytes());

    let mut records = Vec::new();
    for row in reader.deserialize::<EnrichedRecord>() {
        records.push(row?);
    }
    Ok(records)
}

pub fn render(records: &[EnrichedRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(UTF8_BOM.as_bytes().to_vec());

    writer.write_record(COLUMNS)?;
    for r in records {
        writer.serialize(r)?;
    }

    writer
        .into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))
}

/// Replace the table at `path` in one step.
pub fn write(path: &Path, records: &[EnrichedRecord]) -> Result<()> {
    let bytes = render(records)?;
    atomic::write_atomic(path, &bytes)
}
