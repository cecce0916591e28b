//! Persistence of user-chosen space names.

use std::collections::BTreeMap;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use parking_lot::Mutex;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::space::DEFAULT_DESKTOP_NAME;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub space_number: u32,
    pub space_name: String,
}

/// Keyed by the space identifier as shown in [`super::space::Space::space_id`].
pub type NameMap = BTreeMap<String, NameRecord>;

#[derive(Debug, Error)]
pub enum NameStoreError {
    #[error("failed to write space names to {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode space names: {0}")]
    Encode(#[from] ron::Error),
}

pub trait NameStore {
    /// Never fails: missing or unreadable data loads as an empty map.
    fn load(&self) -> NameMap;

    fn save(&self, names: &NameMap) -> Result<(), NameStoreError>;

    /// Stores `new_name` for `space_id`, trimmed, with blank names replaced
    /// by the default desktop name.
    fn rename(
        &self,
        space_id: &str,
        space_number: u32,
        new_name: &str,
    ) -> Result<NameRecord, NameStoreError> {
        let mut names = self.load();
        let record = NameRecord {
            space_number,
            space_name: normalize_name(new_name),
        };
        names.insert(space_id.to_string(), record.clone());
        self.save(&names)?;
        info!(space_id, name = %record.space_name, "renamed space");
        Ok(record)
    }

    /// Whether the stored names may differ from what this store last wrote.
    /// Stores that cannot tell always say yes.
    fn changed_since_last_save(&self) -> bool {
        true
    }
}

pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        DEFAULT_DESKTOP_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Names kept in a RON file, by default `~/.spaceman/space_names.ron`.
#[derive(Debug)]
pub struct FileNameStore {
    path: PathBuf,
    last_write: Mutex<Option<FileStamp>>,
}

/// Identifies one version of the file. Every save renames a fresh file into
/// place, so the inode alone changes on each write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    dev: u64,
    ino: u64,
    len: u64,
    modified: Option<SystemTime>,
}

impl FileStamp {
    fn of(path: &Path) -> Option<FileStamp> {
        let meta = std::fs::metadata(path).ok()?;
        Some(FileStamp {
            dev: meta.dev(),
            ino: meta.ino(),
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

impl FileNameStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_write: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> NameStoreError {
        NameStoreError::Io { path: self.path.clone(), source }
    }
}

impl NameStore for FileNameStore {
    fn load(&self) -> NameMap {
        let buf = match std::fs::read_to_string(&self.path) {
            Ok(buf) => buf,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no saved space names at {:?}", self.path);
                return NameMap::new();
            }
            Err(e) => {
                warn!("failed to read space names from {:?}: {e}", self.path);
                return NameMap::new();
            }
        };
        ron::from_str(&buf).unwrap_or_else(|e| {
            warn!("ignoring corrupt space names in {:?}: {e}", self.path);
            NameMap::new()
        })
    }

    fn save(&self, names: &NameMap) -> Result<(), NameStoreError> {
        let encoded = ron::ser::to_string_pretty(names, PrettyConfig::default())?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        // Write then rename so the watcher never sees a half-written file.
        let tmp = self.path.with_extension("ron.tmp");
        std::fs::write(&tmp, encoded.as_bytes()).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        *self.last_write.lock() = FileStamp::of(&self.path);
        Ok(())
    }

    fn changed_since_last_save(&self) -> bool {
        match *self.last_write.lock() {
            Some(stamp) => FileStamp::of(&self.path) != Some(stamp),
            None => true,
        }
    }
}

/// Names that live only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryNameStore {
    names: Mutex<NameMap>,
    saves: AtomicUsize,
}

impl MemoryNameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names(names: NameMap) -> Self {
        Self {
            names: Mutex::new(names),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of times [`NameStore::save`] has been called.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl NameStore for MemoryNameStore {
    fn load(&self) -> NameMap {
        self.names.lock().clone()
    }

    fn save(&self, names: &NameMap) -> Result<(), NameStoreError> {
        *self.names.lock() = names.clone();
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn record(space_number: u32, space_name: &str) -> NameRecord {
        NameRecord {
            space_number,
            space_name: space_name.into(),
        }
    }

    #[test]
    fn rename_trims_and_defaults_blank_names() {
        let store = MemoryNameStore::new();

        let rec = store.rename("7", 2, "  Work \n").unwrap();
        assert_eq!(rec, record(2, "Work"));

        let rec = store.rename("8", 3, " \t ").unwrap();
        assert_eq!(rec, record(3, DEFAULT_DESKTOP_NAME));

        let names = store.load();
        assert_eq!(names["7"], record(2, "Work"));
        assert_eq!(names["8"], record(3, DEFAULT_DESKTOP_NAME));
    }

    #[test]
    fn rename_keeps_unrelated_records() {
        let store = MemoryNameStore::with_names(NameMap::from([
            ("1".to_string(), record(1, "Mail")),
            ("2".to_string(), record(2, "Code")),
        ]));

        store.rename("2", 2, "Docs").unwrap();

        let names = store.load();
        assert_eq!(names.len(), 2);
        assert_eq!(names["1"], record(1, "Mail"));
        assert_eq!(names["2"], record(2, "Docs"));
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileNameStore::new(dir.path().join("nested").join("names.ron"));

        assert!(store.load().is_empty());

        let names = NameMap::from([("42".to_string(), record(1, "Chat"))]);
        store.save(&names).unwrap();
        assert_eq!(store.load(), names);
        assert!(!store.path().with_extension("ron.tmp").exists());
    }

    #[test]
    fn file_store_treats_corrupt_data_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.ron");
        std::fs::write(&path, "this is { not ron").unwrap();

        let store = FileNameStore::new(&path);
        assert!(store.load().is_empty());

        store.rename("5", 1, "Fresh").unwrap();
        assert_eq!(store.load()["5"], record(1, "Fresh"));
    }

    #[test]
    fn file_store_tells_its_own_writes_from_foreign_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.ron");
        let ours = FileNameStore::new(&path);
        let theirs = FileNameStore::new(&path);
        assert!(ours.changed_since_last_save());

        ours.save(&NameMap::from([("1".to_string(), record(1, "Mail"))])).unwrap();
        assert!(!ours.changed_since_last_save());

        theirs.rename("2", 2, "Code").unwrap();
        assert!(ours.changed_since_last_save());
        assert!(!theirs.changed_since_last_save());

        std::fs::remove_file(&path).unwrap();
        assert!(theirs.changed_since_last_save());
    }
}
