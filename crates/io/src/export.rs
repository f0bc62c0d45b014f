// Copy the working workbook somewhere else

use std::path::Path;

use crate::error::IoError;
use crate::project::ensure_workbook;

/// Byte-for-byte copy of `src` to `dest`. Returns the number of bytes copied.
///
/// Refuses to copy a file onto itself.
pub fn export_copy(src: &Path, dest: &Path) -> Result<u64, IoError> {
    ensure_workbook(src)?;

    let failed = |reason: String| IoError::PersistenceError {
        path: dest.to_path_buf(),
        reason,
    };

    if let (Ok(a), Ok(b)) = (src.canonicalize(), dest.canonicalize()) {
        if a == b {
            return Err(failed("destination is the source workbook".into()));
        }
    }

    let bytes = std::fs::copy(src, dest).map_err(|e| failed(e.to_string()))?;
    log::info!("exported {} -> {} ({} bytes)", src.display(), dest.display(), bytes);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn copies_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.xlsx");
        let dest = dir.path().join("b.xlsx");
        fs::write(&src, b"workbook bytes").unwrap();

        assert_eq!(export_copy(&src, &dest).unwrap(), 14);
        assert_eq!(fs::read(&dest).unwrap(), b"workbook bytes");
    }

    #[test]
    fn refuses_self_copy() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.xlsx");
        fs::write(&src, b"data").unwrap();

        let err = export_copy(&src, &src).unwrap_err();
        assert!(matches!(err, IoError::PersistenceError { .. }));
        assert_eq!(fs::read(&src).unwrap(), b"data");
    }

    #[test]
    fn missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = export_copy(&dir.path().join("x.xlsx"), &dir.path().join("y.xlsx")).unwrap_err();
        assert!(matches!(err, IoError::WorkbookNotFound(_)));
    }

    #[test]
    fn unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.xlsx");
        fs::write(&src, b"data").unwrap();
        let err = export_copy(&src, &dir.path().join("no/such/dir/b.xlsx")).unwrap_err();
        assert!(matches!(err, IoError::PersistenceError { .. }));
    }
}
