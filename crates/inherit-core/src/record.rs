//! The record abstraction consumed by the engine.
//!
//! Hosts that already carry a file type implement [`Record`] for it. Hosts
//! that do not can use [`FileRecord`].

use std::path::{Path, PathBuf};

use crate::error::InheritError;

/// A file-like unit of content flowing through the pipeline.
///
/// `Clone` must produce an independent copy: the engine emits clones of its
/// cached records and downstream stages are free to mutate them.
pub trait Record: Clone {
    /// Current location.
    fn path(&self) -> &Path;

    /// Prior locations, oldest first. Index 0 is the original location.
    fn history(&self) -> &[PathBuf];

    /// Raw content.
    fn contents(&self) -> &[u8];

    /// Location before any upstream stage relocated the record.
    fn original_path(&self) -> &Path {
        self.history().first().map_or_else(|| self.path(), PathBuf::as_path)
    }
}

/// In-memory file with a location history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    history: Vec<PathBuf>,
    contents: Vec<u8>,
}

impl FileRecord {
    /// Create a record whose original and current location is `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            history: vec![path.into()],
            contents: contents.into(),
        }
    }

    /// Read a record from disk.
    ///
    /// # Errors
    ///
    /// Returns [`InheritError::Read`] if the file cannot be read.
    pub fn read(path: impl Into<PathBuf>) -> Result<Self, InheritError> {
        let path = path.into();
        let contents = std::fs::read(&path).map_err(|source| InheritError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(Self::new(path, contents))
    }

    /// Move the record, keeping the previous locations in its history.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.history.last() != Some(&path) {
            self.history.push(path);
        }
    }

    pub fn set_contents(&mut self, contents: impl Into<Vec<u8>>) {
        self.contents = contents.into();
    }

    /// Content as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.contents)
    }
}

impl Record for FileRecord {
    fn path(&self) -> &Path {
        // `new` seeds the history, so it is never empty.
        self.history.last().map_or_else(|| Path::new(""), PathBuf::as_path)
    }

    fn history(&self) -> &[PathBuf] {
        &self.history
    }

    fn contents(&self) -> &[u8] {
        &self.contents
    }
}
