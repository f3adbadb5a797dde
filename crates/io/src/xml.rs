//! Product document files.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::Builder;

use ingsync_recon::{parse_document, Document, ReconError};

pub fn read_document(path: &Path) -> Result<Document, ReconError> {
    let xml = fs::read_to_string(path)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
    parse_document(&xml).map_err(|e| match e {
        ReconError::Xml(msg) => ReconError::Xml(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Write `document` as UTF-8. The file is staged next to `path` and renamed
/// into place, so a failed write never leaves a truncated output behind.
/// An existing output keeps its permissions; a new one gets the mode a plain
/// create would give it.
pub fn write_document(document: &Document, path: &Path) -> Result<(), ReconError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .map_err(|e| ReconError::Io(format!("cannot create {}: {e}", dir.display())))?;

    let mut builder = Builder::new();
    builder.prefix(".ingsync-");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut staged = builder
        .tempfile_in(dir)
        .map_err(|e| ReconError::Io(format!("cannot stage output in {}: {e}", dir.display())))?;
    if let Ok(existing) = fs::metadata(path) {
        staged
            .as_file()
            .set_permissions(existing.permissions())
            .map_err(|e| ReconError::Io(format!("cannot set permissions on output: {e}")))?;
    }
    staged
        .write_all(document.to_xml_string().as_bytes())
        .and_then(|_| staged.flush())
        .map_err(|e| ReconError::Io(format!("cannot write output: {e}")))?;
    staged
        .persist(path)
        .map_err(|e| ReconError::Io(format!("cannot write {}: {}", path.display(), e.error)))?;
    Ok(())
}
