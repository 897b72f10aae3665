use crate::error::Result;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Stage `data` in a tempfile next to `path`, creating `.rollcall/` or any
/// other missing parent first.
fn stage(path: &Path, data: &[u8]) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(data)?;
    staged.flush()?;
    Ok(staged)
}

/// Swap `data` in at `path` with a single rename. Readers see the old
/// contents or the new ones, never a half-written file.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    stage(path, data)?.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Seed `path` with `data` unless something already lives there. Returns
/// whether this call created the file.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    match stage(path, data)?.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error.into()),
    }
}
