use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::{AppError, Result};

/// `<file>.backup` next to the original
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".backup");
    PathBuf::from(name)
}

/// Copy `path` to `<path>.backup` unless a backup already exists.
/// Returns the backup path when one was created.
pub fn backup_once(path: &Path) -> Result<Option<PathBuf>> {
    let backup = backup_path(path);
    if backup.exists() {
        return Ok(None);
    }
    fs::copy(path, &backup).map_err(|e| {
        AppError::IoError(format!("Failed to back up {}: {}", path.display(), e))
    })?;
    Ok(Some(backup))
}

/// Write a text file, creating parent directories as needed
pub fn write_text(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .map_err(|e| AppError::IoError(format!("Failed to write {}: {}", path.display(), e)))
}

pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| AppError::IoError(format!("Failed to read {}: {}", path.display(), e)))
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/tmp/vagas.csv")),
            PathBuf::from("/tmp/vagas.csv.backup")
        );
    }

    #[test]
    fn test_write_text_creates_parents() {
        let root = std::env::temp_dir().join(format!("vagas_storage_{}", uuid::Uuid::new_v4()));
        let file = root.join("a").join("b.txt");
        write_text(&file, "ok").unwrap();
        assert_eq!(read_text(&file).unwrap(), "ok");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let err = read_text(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, AppError::IoError(_)));
    }
}
