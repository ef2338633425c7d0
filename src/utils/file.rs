use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Last modification time in milliseconds since the epoch, `0` when the
/// platform does not report one.
pub fn last_modified_millis(metadata: &fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .map(|time| DateTime::<Utc>::from(time).timestamp_millis())
        .unwrap_or(0)
}

/// Reads a text file, replacing invalid UTF-8 sequences.
pub fn read_file_to_string(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Lists every regular file below `root`, sorted, without following
/// symlinks. A missing root yields an empty list.
pub fn list_files_recursive(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !root.is_dir() {
        return Ok(files);
    }

    let mut pending = vec![root.to_path_buf()];
    while let Some(directory) = pending.pop() {
        let entries = fs::read_dir(&directory)
            .with_context(|| format!("Failed to list directory {:?}", directory))?;
        for entry in entries {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }

    files.sort();
    Ok(files)
}

/// `path` relative to `root` with `/` separators.
pub fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_files_recursive_is_sorted() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("org/example");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("B.class"), b"").unwrap();
        fs::write(nested.join("A.class"), b"").unwrap();

        let files = list_files_recursive(temp_dir.path()).unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|file| relative_slash_path(temp_dir.path(), file))
            .collect();
        assert_eq!(relative, vec!["org/example/A.class", "org/example/B.class"]);
    }

    #[test]
    fn test_missing_directory_lists_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let files = list_files_recursive(&temp_dir.path().join("absent")).unwrap();
        assert!(files.is_empty());
    }
}
