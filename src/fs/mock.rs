use super::{DirEntry, FileSystem, FileType};
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct MockEntry {
    content: Option<String>,
    file_type: FileType,
}

/// In-memory file tree; relative paths resolve against `root`
pub struct MockFileSystem {
    files: RwLock<BTreeMap<PathBuf, MockEntry>>,
    root: PathBuf,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::with_root(PathBuf::from("/mock"))
    }

    pub fn with_root(root: PathBuf) -> Self {
        let fs = Self {
            files: RwLock::new(BTreeMap::new()),
            root,
        };
        let root = fs.root.clone();
        fs.insert_dir(&root);
        fs
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
        let path = self.normalize_path(path.as_ref());
        let mut files = self.write_lock();
        if let Some(parent) = path.parent() {
            Self::ensure_parents(&mut files, parent);
        }
        files.insert(
            path,
            MockEntry {
                content: Some(content.to_string()),
                file_type: FileType::File,
            },
        );
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = self.normalize_path(path.as_ref());
        self.insert_dir(&path);
    }

    /// Paths of every file currently stored
    pub fn files(&self) -> Vec<PathBuf> {
        self.read_lock()
            .iter()
            .filter(|(_, e)| e.file_type == FileType::File)
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn insert_dir(&self, path: &Path) {
        let mut files = self.write_lock();
        Self::ensure_parents(&mut files, path);
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        self.files.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        self.files.write().unwrap_or_else(|e| e.into_inner())
    }

    fn normalize_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn ensure_parents(files: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            files.entry(current.clone()).or_insert(MockEntry {
                content: None,
                file_type: FileType::Directory,
            });
        }
    }

    fn file_type(&self, path: &Path) -> Option<FileType> {
        let path = self.normalize_path(path);
        self.read_lock().get(&path).map(|e| e.file_type)
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.file_type(path).is_some()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.file_type(path) == Some(FileType::Directory)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.file_type(path) == Some(FileType::File)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let path = self.normalize_path(path);
        let files = self.read_lock();
        let entry = files
            .get(&path)
            .ok_or_else(|| anyhow!("File not found: {:?}", path))?;

        entry
            .content
            .clone()
            .ok_or_else(|| anyhow!("Not a file: {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let path = self.normalize_path(path);
        let files = self.read_lock();

        if !files.contains_key(&path) {
            return Err(anyhow!("Directory not found: {:?}", path));
        }

        let entries = files
            .iter()
            .filter(|(p, _)| p.parent() == Some(path.as_path()))
            .map(|(p, entry)| DirEntry {
                path: p.clone(),
                name: p
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                file_type: entry.file_type,
            })
            .collect();

        Ok(entries)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if self.is_dir(path) {
            return Err(anyhow!("Is a directory: {:?}", path));
        }
        self.add_file(path, contents);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<bool> {
        let path = self.normalize_path(path);
        let mut files = self.write_lock();
        match files.get(&path).map(|e| e.file_type) {
            Some(FileType::Directory) => Err(anyhow!("Is a directory: {:?}", path)),
            Some(_) => Ok(files.remove(&path).is_some()),
            None => Ok(false),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        if self.is_file(path) {
            return Err(anyhow!("Not a directory: {:?}", path));
        }
        self.add_dir(path);
        Ok(())
    }
}
