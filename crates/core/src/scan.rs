//! Input discovery for directory arguments.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::orchestrator::is_supported_input;

/// Collects supported video files under `dir`, sorted by path.
///
/// Subdirectories are only entered when `recursive` is set.
pub async fn scan_directory(dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                if recursive {
                    pending.push(path);
                }
            } else if is_supported_input(&path) {
                found.push(path);
            }
        }
    }

    found.sort();
    debug!(dir = %dir.display(), recursive, files = found.len(), "Scanned input directory");
    Ok(found)
}

/// Expands each argument: directories are scanned, files are kept as given.
///
/// Paths that do not exist are kept so the batch reports them as failures.
pub async fn expand_inputs(paths: &[PathBuf], recursive: bool) -> io::Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for path in paths {
        if fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false) {
            inputs.extend(scan_directory(path, recursive).await?);
        } else {
            inputs.push(path.clone());
        }
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scan_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        fixtures::touch_inputs(
            dir.path(),
            &["b.mp4", "a.MKV", "notes.txt", "sub/c.mov"],
        )
        .unwrap();

        let flat = scan_directory(dir.path(), false).await.unwrap();
        assert_eq!(flat, vec![dir.path().join("a.MKV"), dir.path().join("b.mp4")]);

        let deep = scan_directory(dir.path(), true).await.unwrap();
        assert_eq!(
            deep,
            vec![
                dir.path().join("a.MKV"),
                dir.path().join("b.mp4"),
                dir.path().join("sub/c.mov"),
            ]
        );
    }

    #[tokio::test]
    async fn test_scan_missing_dir_errors() {
        let dir = TempDir::new().unwrap();
        assert!(scan_directory(&dir.path().join("nope"), false).await.is_err());
    }

    #[tokio::test]
    async fn test_expand_inputs_keeps_files_and_missing_paths() {
        let dir = TempDir::new().unwrap();
        let files = fixtures::touch_inputs(dir.path(), &["clips/x.mp4", "single.avi"]).unwrap();
        let missing = dir.path().join("missing.mp4");

        let inputs = expand_inputs(
            &[dir.path().join("clips"), files[1].clone(), missing.clone()],
            false,
        )
        .await
        .unwrap();
        assert_eq!(inputs, vec![files[0].clone(), files[1].clone(), missing]);
    }
}
