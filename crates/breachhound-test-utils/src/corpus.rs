//! Temporary corpus fixture for scanner and handler tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temp directory laid out like a corpus root, removed on drop.
pub struct TempCorpus {
    dir: TempDir,
    root: PathBuf,
}

impl TempCorpus {
    /// Create an empty fixture. The root itself is not created, so callers
    /// exercise the on-demand creation path.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp corpus dir");
        let root = dir.path().join("breaches");
        Self { dir, root }
    }

    /// Create a fixture pre-populated with `(name, contents)` files.
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let fixture = Self::new();
        for (name, contents) in files {
            fixture.write(name, contents);
        }
        fixture
    }

    /// Write a file under the corpus root, creating directories as needed.
    pub fn write(&self, name: &str, contents: &str) {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create corpus subdir");
        }
        std::fs::write(path, contents).expect("write corpus file");
    }

    /// The corpus root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A sibling path outside the corpus root, for store/report dirs.
    pub fn sibling(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Default for TempCorpus {
    fn default() -> Self {
        Self::new()
    }
}
