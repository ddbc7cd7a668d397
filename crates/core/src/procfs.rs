use crate::error::{CoreError, Result};
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Root of the proc filesystem that sources read from.
///
/// Defaults to `/proc`; pointing it elsewhere lets the exporter run against a
/// host mount inside a container, and lets tests run against fixture trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcFs {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path relative to the root, e.g. `net/dev`
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

/// Open a pseudo-file for a single scan. The handle is closed when the reader drops.
pub fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| CoreError::open(path, e))
}
