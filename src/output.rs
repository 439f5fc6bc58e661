// Atomic file output shared by the mesh and image sinks
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Result, TerrainError};

/// Write `path` through a temporary file in the same directory, renaming it
/// into place only once `write` succeeds. A failed write leaves no file behind.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(|e| TerrainError::write(path, e))?;
    {
        let mut writer = BufWriter::new(&mut file);
        write(&mut writer)?;
        writer.flush().map_err(|e| TerrainError::write(path, e))?;
    }

    file.persist(path)
        .map_err(|e| TerrainError::write(path, e.error))?;
    Ok(())
}
