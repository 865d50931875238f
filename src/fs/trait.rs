//! FileSystem trait definition

use anyhow::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

/// A directory entry returned by read_dir
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub path: PathBuf,
    pub name: String,
    pub file_type: FileType,
}

impl DirEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.name
    }

    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }
}

/// Abstraction over the file operations runbox performs, so the sandbox and
/// lint expansion can run against an in-memory tree in tests
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Entries directly inside `path`, sorted by name
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Create or truncate `path`, creating parent directories as needed
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Remove a file if present; returns whether anything was removed
    fn remove_file(&self, path: &Path) -> Result<bool>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;
}
