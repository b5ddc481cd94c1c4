use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::error::{Result, StoreError};

/// One uploaded file: its name (no directories) and raw bytes.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StoreError::FileNotFound(path.display().to_string()));
        }

        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| StoreError::InvalidTableName(path.display().to_string()))?
            .to_string();
        let content = fs::read(path)?;

        Ok(Self { name, content })
    }
}

/// Reads every CSV file named on the command line into an upload batch.
///
/// Directories contribute their `.csv` entries in file-name order; anything
/// else inside them is skipped. A file given explicitly must be a CSV.
pub fn collect_csv_files(paths: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    let mut files = Vec::new();

    for path in paths {
        if !path.exists() {
            return Err(StoreError::FileNotFound(path.display().to_string()));
        }

        if path.is_dir() {
            files.extend(collect_directory(path)?);
        } else if is_csv(path) {
            files.push(UploadedFile::from_path(path)?);
        } else {
            return Err(StoreError::UnsupportedFormat(path.display().to_string()));
        }
    }

    Ok(files)
}

fn collect_directory(path: &Path) -> Result<Vec<UploadedFile>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(path)?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    let mut files = Vec::new();
    for entry in entries {
        if is_csv(&entry) {
            files.push(UploadedFile::from_path(&entry)?);
        } else {
            debug!("Skipping non-CSV file {}", entry.display());
        }
    }

    if files.is_empty() {
        warn!("No CSV files found in {}", path.display());
    }
    Ok(files)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::write;
    use tempfile::tempdir;

    #[test]
    fn test_detect_csv() {
        assert!(is_csv(Path::new("test.csv")));
        assert!(is_csv(Path::new("TEST.CSV")));
        assert!(!is_csv(Path::new("test.parquet")));
        assert!(!is_csv(Path::new("test")));
    }

    #[test]
    fn test_collect_directory() {
        let dir = tempdir().unwrap();
        write(dir.path().join("b.csv"), "x\n1").unwrap();
        write(dir.path().join("a.csv"), "y\n2").unwrap();
        write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = collect_csv_files(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
        assert_eq!(files[0].content, b"y\n2");
    }

    #[test]
    fn test_explicit_non_csv_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        write(&path, "{}").unwrap();

        let result = collect_csv_files(&[path]);
        assert!(matches!(result, Err(StoreError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_missing_path() {
        let result = collect_csv_files(&[PathBuf::from("/definitely/not/here.csv")]);
        assert!(matches!(result, Err(StoreError::FileNotFound(_))));
    }
}
