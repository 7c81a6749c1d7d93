//! Corpus management — the directory tree of breach files.
//!
//! The corpus root is created on demand; a missing root is an empty corpus,
//! not an error. Files are eligible when their name matches the configured
//! extension allow-list.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::BotError;

/// A corpus file listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    /// File name relative to the corpus root.
    pub name: String,
    /// Size in bytes.
    pub size_bytes: u64,
}

/// Handle to the corpus directory tree.
pub struct Corpus {
    root: PathBuf,
    extensions: Vec<String>,
}

impl Corpus {
    /// Create a handle for the given root and extension allow-list.
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            root: root.into(),
            extensions,
        }
    }

    /// The corpus root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `name` passes the extension allow-list.
    pub fn is_eligible(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| name.ends_with(ext))
    }

    /// Enumerate all eligible files under the root, creating the root if
    /// absent. Paths are returned in sorted order for deterministic scans.
    pub fn files(&self) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.root)?;
        let mut files = Vec::new();
        collect_recursive(&self.root, &self.extensions, &mut files)?;
        files.sort();
        Ok(files)
    }

    /// List eligible files with sizes, for the `listbreaches` command.
    pub fn list(&self) -> std::io::Result<Vec<CorpusEntry>> {
        let mut entries = Vec::new();
        for path in self.files()? {
            let metadata = std::fs::metadata(&path)?;
            let name = path
                .strip_prefix(&self.root)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            entries.push(CorpusEntry {
                name,
                size_bytes: metadata.len(),
            });
        }
        Ok(entries)
    }

    /// Add a file to the corpus. The name must pass the extension allow-list
    /// and must not escape the root.
    pub fn add_file(&self, name: &str, contents: &[u8]) -> Result<(), BotError> {
        if !self.is_eligible(name) {
            return Err(BotError::Validation(format!(
                "only {} files are allowed",
                self.extensions.join(", ")
            )));
        }
        let path = self.resolve(name)?;
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(&path, contents)?;
        info!(file = %name, bytes = contents.len(), "corpus file added");
        Ok(())
    }

    /// Delete a file from the corpus by name.
    pub fn delete_file(&self, name: &str) -> Result<(), BotError> {
        let path = self.resolve(name)?;
        if !path.exists() {
            return Err(BotError::NotFound(format!("no corpus file named '{name}'")));
        }
        std::fs::remove_file(&path)?;
        info!(file = %name, "corpus file deleted");
        Ok(())
    }

    /// Resolve a user-supplied name against the root, rejecting traversal.
    fn resolve(&self, name: &str) -> Result<PathBuf, BotError> {
        let candidate = Path::new(name);
        if candidate.is_absolute()
            || candidate
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(BotError::Validation(format!(
                "'{name}' is not a plain file name"
            )));
        }
        Ok(self.root.join(candidate))
    }
}

/// Walk a directory recursively, collecting files that pass the allow-list.
/// Hidden files and directories are skipped.
fn collect_recursive(
    dir: &Path,
    extensions: &[String],
    out: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Some(name) = path.file_name().and_then(|n| n.to_str())
            && name.starts_with('.')
        {
            continue;
        }

        if path.is_dir() {
            collect_recursive(&path, extensions, out)?;
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str())
            && extensions.iter().any(|ext| name.ends_with(ext))
        {
            out.push(path);
        }
    }
    Ok(())
}
