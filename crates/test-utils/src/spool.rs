//! Temporary spool directories for delivered files.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A throwaway directory standing in for the transport's spool.
///
/// Removed with everything in it when dropped.
pub struct Spool {
    dir: TempDir,
}

impl Spool {
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("snapshot-spool-")
            .tempdir()
            .expect("Failed to create spool directory");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `data` to `name` inside the spool.
    pub fn write(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, data).expect("Failed to write spool file");
        path
    }
}

impl Default for Spool {
    fn default() -> Self {
        Self::new()
    }
}
