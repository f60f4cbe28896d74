use crate::cache::{ArtifactId, CacheEntry};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

/// Directory of rendered equations, one file per artifact.
///
/// Entry paths are resolved against `root`. Parent directories are created
/// on the first write, and each artifact is written at most once per store.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    written: HashSet<ArtifactId>,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: HashSet::new(),
        }
    }

    /// Full path of the file backing `entry`.
    pub fn resolve(&self, entry: &CacheEntry) -> PathBuf {
        self.root.join(&entry.path)
    }

    /// Writes `bytes` for `entry` unless it was already written.
    ///
    /// Returns `true` if the file was written by this call.
    pub fn write(&mut self, entry: &CacheEntry, bytes: &[u8]) -> std::io::Result<bool> {
        if self.written.contains(&entry.id) {
            return Ok(false);
        }
        let path = self.resolve(entry);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        log::debug!("Wrote artifact {} to {:?}", entry.id, path);
        self.written.insert(entry.id.clone());
        Ok(true)
    }

    pub fn contains(&self, id: &ArtifactId) -> bool {
        self.written.contains(id)
    }

    pub fn len(&self) -> usize {
        self.written.len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }
}
