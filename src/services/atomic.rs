use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::Result;

/// Anonymous temp file next to `path`, so the final rename stays on one
/// filesystem.
pub fn staging_file(path: &Path) -> Result<NamedTempFile> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    Ok(NamedTempFile::new_in(parent)?)
}

/// Rename a fully written temp file over `path`. The old file stays in
/// place until the rename succeeds.
pub fn commit(tmp: NamedTempFile, path: &Path) -> Result<()> {
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = staging_file(path)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    commit(tmp, path)
}
