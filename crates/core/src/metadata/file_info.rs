//! Static file information read from the filesystem.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Static information about a file, already rendered as template values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// File stem (name without extension).
    pub filename: String,
    /// Extension without the leading dot.
    pub ext: String,
    /// Current date, `YYYY-MM-DD`.
    pub date: String,
    /// Current time, `HH-MM-SS`.
    pub time: String,
    /// Current date and time, `YYYY-MM-DD_HH-MM-SS`.
    pub datetime: String,
    /// File creation date, `YYYY-MM-DD`.
    pub create_date: String,
    /// Size in MiB rounded to two decimals, `"0"` when unknown.
    pub size: String,
    /// Name of the parent directory.
    pub source: String,
    /// Full path of the parent directory.
    pub source_full: String,
}

impl FileInfo {
    /// Reads file information using the current wall-clock time.
    pub fn read(path: &Path) -> Self {
        Self::read_at(path, Local::now())
    }

    /// Reads file information, using `now` for the date and time fields.
    ///
    /// Never fails: a missing or unreadable file yields [`FileInfo::fallback_at`].
    pub fn read_at(path: &Path, now: DateTime<Local>) -> Self {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not stat file, using defaults");
                return Self::fallback_at(path, now);
            }
        };

        let created: DateTime<Local> = metadata
            .created()
            .or_else(|_| metadata.modified())
            .map(DateTime::from)
            .unwrap_or(now);

        let mut info = Self::fallback_at(path, now);
        info.create_date = created.format("%Y-%m-%d").to_string();
        info.size = format_rounded(metadata.len() as f64 / BYTES_PER_MIB, 2);
        info
    }

    /// Information derived from the path alone.
    pub fn fallback(path: &Path) -> Self {
        Self::fallback_at(path, Local::now())
    }

    /// Information derived from the path alone, using `now` for all dates.
    pub fn fallback_at(path: &Path, now: DateTime<Local>) -> Self {
        let parent = path.parent();

        Self {
            filename: path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            ext: path
                .extension()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H-%M-%S").to_string(),
            datetime: now.format("%Y-%m-%d_%H-%M-%S").to_string(),
            create_date: now.format("%Y-%m-%d").to_string(),
            size: "0".to_string(),
            source: parent
                .and_then(|p| p.file_name())
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            source_full: parent
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Rounds `value` to `decimals` places and renders it the way a float prints:
/// whole numbers keep one decimal (`3.0`), others drop trailing zeros (`12.5`).
pub fn format_rounded(value: f64, decimals: u32) -> String {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        rounded.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_format_rounded() {
        assert_eq!(format_rounded(12.5, 2), "12.5");
        assert_eq!(format_rounded(3.0, 2), "3.0");
        assert_eq!(format_rounded(1.23456, 2), "1.23");
        assert_eq!(format_rounded(0.0, 2), "0.0");
        assert_eq!(format_rounded(65.04, 1), "65.0");
        assert_eq!(format_rounded(65.06, 1), "65.1");
    }

    #[test]
    fn test_read_existing_file() {
        let dir = TempDir::new().unwrap();
        let source_dir = dir.path().join("holiday");
        std::fs::create_dir_all(&source_dir).unwrap();
        let path = source_dir.join("beach.mov");
        std::fs::write(&path, vec![0u8; 1024 * 1024 + 512 * 1024]).unwrap();

        let info = FileInfo::read_at(&path, fixed_now());
        assert_eq!(info.filename, "beach");
        assert_eq!(info.ext, "mov");
        assert_eq!(info.size, "1.5");
        assert_eq!(info.date, "2024-03-09");
        assert_eq!(info.time, "14-05-07");
        assert_eq!(info.datetime, "2024-03-09_14-05-07");
        assert_eq!(info.source, "holiday");
        assert_eq!(info.source_full, source_dir.to_string_lossy());
        assert_eq!(info.create_date.len(), 10);
    }

    #[test]
    fn test_read_missing_file_falls_back() {
        let path = PathBuf::from("/no/such/dir/clip.mkv");
        let info = FileInfo::read_at(&path, fixed_now());
        assert_eq!(info.filename, "clip");
        assert_eq!(info.ext, "mkv");
        assert_eq!(info.size, "0");
        assert_eq!(info.create_date, "2024-03-09");
        assert_eq!(info.source, "dir");
    }

    #[test]
    fn test_empty_file_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.mp4");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(FileInfo::read(&path).size, "0.0");
    }
}
