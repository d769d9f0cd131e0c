//! Temporary download roots for filesystem tests.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A throwaway download root removed when dropped.
#[derive(Debug)]
pub struct DownloadRoot {
    _temp: TempDir,
    root: PathBuf,
}

impl DownloadRoot {
    /// Create an empty download root inside a fresh temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the temporary directory cannot be created.
    pub fn new() -> io::Result<Self> {
        let temp = tempfile::Builder::new().prefix("stowage-").tempdir()?;
        let root = temp.path().join("downloads");
        fs::create_dir_all(&root)?;
        Ok(Self { _temp: temp, root })
    }

    /// Absolute path of the download root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Sibling directory of the root, useful as a symlink escape target.
    #[must_use]
    pub fn outside(&self) -> PathBuf {
        self.root.with_file_name("outside")
    }

    /// Write `contents` to `relative`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be written.
    pub fn write_file(&self, relative: &str, contents: &[u8]) -> io::Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Create `relative` as a directory, including parents.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be created.
    pub fn create_dir(&self, relative: &str) -> io::Result<PathBuf> {
        let path = self.root.join(relative);
        fs::create_dir_all(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_file_creates_parents() -> io::Result<()> {
        let root = DownloadRoot::new()?;
        let written = root.write_file("a/b/c.txt", b"abc")?;
        assert_eq!(fs::read(written)?, b"abc");
        assert!(!root.outside().starts_with(root.path()));
        Ok(())
    }
}
