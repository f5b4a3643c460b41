//! Three-directory event store on disk.
//!
//! Each document lives in exactly one of `new/`, `updated/` or `archive/`.
//! Per file name the lifecycle is:
//!
//! ```text
//! absent   --sync (not archived)-------------> new
//! archived --sync (bytes differ)-------------> updated   (archive copy removed)
//! archived --sync (bytes equal)--------------> archived  (untouched)
//! new | updated --rollover-------------------> archived
//! ```
//!
//! Rollover must run before any sync in a run, so that comparisons are always
//! made against the last finished run and never against the run in progress.

pub mod naming;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{HarvestError, Result};

pub use naming::{derive_filename, sanitize_title, FilenameEncoding};

/// One of the three store directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shelf {
    New,
    Updated,
    Archive,
}

impl Shelf {
    pub const ALL: [Shelf; 3] = [Shelf::New, Shelf::Updated, Shelf::Archive];

    pub fn dir_name(self) -> &'static str {
        match self {
            Shelf::New => "new",
            Shelf::Updated => "updated",
            Shelf::Archive => "archive",
        }
    }
}

/// Classification of one synchronised record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Not in the archive; written to `new/`.
    New,
    /// Archived with different content; written to `updated/`.
    Updated,
    /// Archived with identical content; left alone.
    Duplicate,
}

/// Handle to a store rooted at a directory.
#[derive(Debug, Clone)]
pub struct EventStore {
    root: PathBuf,
}

impl EventStore {
    /// Open a store, creating the three directories if they are missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { root: root.into() };
        for shelf in Shelf::ALL {
            let dir = store.dir(shelf);
            fs::create_dir_all(&dir).map_err(|source| HarvestError::Store {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, shelf: Shelf) -> PathBuf {
        self.root.join(shelf.dir_name())
    }

    pub fn path(&self, shelf: Shelf, file_name: &str) -> PathBuf {
        self.dir(shelf).join(file_name)
    }

    /// Where a document currently lives, if anywhere.
    pub fn locate(&self, file_name: &str) -> Option<Shelf> {
        Shelf::ALL
            .into_iter()
            .find(|shelf| self.path(*shelf, file_name).is_file())
    }

    /// File names on a shelf, sorted.
    pub fn list(&self, shelf: Shelf) -> Result<Vec<String>> {
        let dir = self.dir(shelf);
        let store_err = |source| HarvestError::Store {
            path: dir.clone(),
            source,
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir).map_err(store_err)? {
            let entry = entry.map_err(store_err)?;
            if !entry.file_type().map_err(store_err)?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => warn!("Ignoring non UTF-8 file name {:?} in {}", name, dir.display()),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Move everything in `new/` and then `updated/` into `archive/`.
    ///
    /// `on_moved(file_name, index, total)` is called after each move. A failed
    /// move aborts the rollover: synchronising against a half-rolled archive
    /// would misclassify records.
    pub fn rollover(&self, mut on_moved: impl FnMut(&str, usize, usize)) -> Result<usize> {
        let mut pending: Vec<(Shelf, String)> = Vec::new();
        for shelf in [Shelf::New, Shelf::Updated] {
            pending.extend(self.list(shelf)?.into_iter().map(|name| (shelf, name)));
        }

        let total = pending.len();
        for (index, (shelf, name)) in pending.iter().enumerate() {
            let from = self.path(*shelf, name);
            let to = self.path(Shelf::Archive, name);
            fs::rename(&from, &to).map_err(|source| HarvestError::Store {
                path: from.clone(),
                source,
            })?;
            debug!("Archived {} from {}", name, shelf.dir_name());
            on_moved(name, index, total);
        }

        Ok(total)
    }

    /// Reconcile a freshly rendered document against the archive.
    pub fn sync(&self, file_name: &str, document: &str) -> Result<SyncOutcome> {
        let archived = self.path(Shelf::Archive, file_name);

        match fs::read(&archived) {
            Ok(existing) if existing == document.as_bytes() => Ok(SyncOutcome::Duplicate),
            Ok(_) => {
                self.write(Shelf::Updated, file_name, document)?;
                if let Err(e) = fs::remove_file(&archived) {
                    // The updated copy supersedes it at the next rollover.
                    warn!("Failed to remove {}: {}", archived.display(), e);
                }
                Ok(SyncOutcome::Updated)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.write(Shelf::New, file_name, document)?;
                Ok(SyncOutcome::New)
            }
            Err(source) => Err(HarvestError::WriteFailure {
                path: archived,
                source,
            }),
        }
    }

    fn write(&self, shelf: Shelf, file_name: &str, document: &str) -> Result<()> {
        let path = self.path(shelf, file_name);
        fs::write(&path, document).map_err(|source| HarvestError::WriteFailure { path, source })
    }
}
