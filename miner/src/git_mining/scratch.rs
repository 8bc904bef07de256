//! Scratch directory holding the newer revision of changed files while the
//! older revision is checked out.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Subdirectory of the configured scratch root owned by the buffer. Only
/// this directory is ever cleared.
const BUFFER_DIR: &str = "recordscope-buf";

/// Directory of blobs keyed by ordinal.
#[derive(Debug, Clone)]
pub struct ScratchBuffer {
    dir: PathBuf,
}

impl ScratchBuffer {
    /// Buffer living in a dedicated subdirectory of `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join(BUFFER_DIR),
        }
    }

    /// Remove every blob, creating the directory if needed.
    pub fn reset(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        fs::create_dir_all(&self.dir)
    }

    pub fn store(&self, ordinal: usize, bytes: &[u8]) -> io::Result<()> {
        fs::write(self.slot(ordinal), bytes)
    }

    pub fn load(&self, ordinal: usize) -> io::Result<Vec<u8>> {
        fs::read(self.slot(ordinal))
    }

    fn slot(&self, ordinal: usize) -> PathBuf {
        self.dir.join(ordinal.to_string())
    }
}

/// Read a file, mapping a missing file to `None`.
pub fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
