//! Collision-free output path allocation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Hands out output paths that neither exist on disk nor were already given
/// out by this allocator.
///
/// `name.mp4` is tried first, then `name_1.mp4`, `name_2.mp4`, ...
#[derive(Debug, Default)]
pub struct OutputPathAllocator {
    reserved: HashSet<PathBuf>,
}

impl OutputPathAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves and returns the first free path for `stem.extension` in `dir`.
    pub fn allocate(&mut self, dir: &Path, stem: &str, extension: &str) -> PathBuf {
        let extension = extension.trim_start_matches('.');
        let mut suffix = 0usize;

        loop {
            let file_name = match (suffix, extension.is_empty()) {
                (0, true) => stem.to_string(),
                (0, false) => format!("{}.{}", stem, extension),
                (n, true) => format!("{}_{}", stem, n),
                (n, false) => format!("{}_{}.{}", stem, n, extension),
            };
            let candidate = dir.join(file_name);

            if !self.reserved.contains(&candidate) && !candidate.exists() {
                self.reserved.insert(candidate.clone());
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Number of paths handed out so far.
    pub fn reserved_count(&self) -> usize {
        self.reserved.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_same_name_in_one_batch() {
        let dir = TempDir::new().unwrap();
        let mut allocator = OutputPathAllocator::new();

        let first = allocator.allocate(dir.path(), "name", "mp4");
        let second = allocator.allocate(dir.path(), "name", "mp4");
        let third = allocator.allocate(dir.path(), "name", ".mp4");

        assert_eq!(first, dir.path().join("name.mp4"));
        assert_eq!(second, dir.path().join("name_1.mp4"));
        assert_eq!(third, dir.path().join("name_2.mp4"));
        assert_eq!(allocator.reserved_count(), 3);
    }

    #[test]
    fn test_existing_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("clip.webm"), b"x").unwrap();
        std::fs::write(dir.path().join("clip_1.webm"), b"x").unwrap();

        let mut allocator = OutputPathAllocator::new();
        assert_eq!(
            allocator.allocate(dir.path(), "clip", "webm"),
            dir.path().join("clip_2.webm")
        );
    }

    #[test]
    fn test_different_extensions_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let mut allocator = OutputPathAllocator::new();
        assert_eq!(
            allocator.allocate(dir.path(), "a", "mp4"),
            dir.path().join("a.mp4")
        );
        assert_eq!(
            allocator.allocate(dir.path(), "a", "mkv"),
            dir.path().join("a.mkv")
        );
    }
}
