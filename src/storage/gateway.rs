//! Reading and writing snapshots
//!
//! The [`Gateway`] turns a [`Store`] into JSON documents and back. Where
//! those documents live is decided by a [`Medium`]: a directory on disk for
//! the application, or memory for tests.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};

use crate::{
    domain::NotificationCenter,
    storage::{
        snapshot::{Backup, Snapshot},
        store::Store,
    },
};

/// Collections whose presence marks a document as a snapshot.
///
/// An import is accepted only if at least one of these keys holds an array.
const RECOGNISED_KEYS: [&str; 4] = [
    "commercialLicenses",
    "leaseContracts",
    "operationalLicenses",
    "procedures",
];

/// Key under which the notification state is kept.
const STATE_KEY: &str = "state.json";

/// Somewhere documents can be read from and written to by key.
pub trait Medium {
    /// Reads a document. Returns `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists but cannot be read.
    fn read(&self, key: &str) -> io::Result<Option<String>>;

    /// Replaces a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    fn write(&self, key: &str, contents: &str) -> io::Result<()>;
}

/// Documents stored as files in a directory.
///
/// Writes go to a temporary file which is then renamed over the target, so a
/// failed write never leaves a half-written document behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryMedium {
    dir: PathBuf,
}

impl DirectoryMedium {
    /// Uses the given directory. It is created on first write if needed.
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// The directory documents are stored in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Medium for DirectoryMedium {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.dir.join(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, contents: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(key);
        let temp = self.dir.join(format!(".{key}.tmp"));

        std::fs::write(&temp, contents)?;
        std::fs::rename(&temp, &target).inspect_err(|_| {
            let _ = std::fs::remove_file(&temp);
        })
    }
}

/// Documents held in memory.
///
/// Writes can be made to fail on demand, to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    documents: RefCell<HashMap<String, String>>,
    fail_writes: Cell<bool>,
}

impl MemoryMedium {
    /// An empty medium.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A medium holding a single document.
    #[must_use]
    pub fn with_document(key: &str, contents: &str) -> Self {
        let medium = Self::new();
        medium
            .documents
            .borrow_mut()
            .insert(key.to_string(), contents.to_string());
        medium
    }

    /// Makes every subsequent write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// The current contents of a document.
    #[must_use]
    pub fn document(&self, key: &str) -> Option<String> {
        self.documents.borrow().get(key).cloned()
    }
}

impl Medium for MemoryMedium {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.document(key))
    }

    fn write(&self, key: &str, contents: &str) -> io::Result<()> {
        if self.fail_writes.get() {
            return Err(io::Error::new(
                io::ErrorKind::StorageFull,
                "storage quota exceeded",
            ));
        }
        self.documents
            .borrow_mut()
            .insert(key.to_string(), contents.to_string());
        Ok(())
    }
}

/// Error returned when a snapshot cannot be saved.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// The store could not be serialized.
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The snapshot could not be written.
    #[error("failed to write snapshot: {0}")]
    Io(#[from] io::Error),
}

/// Error returned when a stored snapshot exists but cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The snapshot could not be read.
    #[error("failed to read snapshot: {0}")]
    Io(#[from] io::Error),
    /// The snapshot is not a readable snapshot document.
    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Error returned when an imported backup is rejected.
///
/// The live store is never touched when an import fails.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The file is not valid JSON.
    #[error("the file is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The file is JSON, but not a snapshot.
    #[error("unrecognised backup format: expected at least one of {}", RECOGNISED_KEYS.join(", "))]
    UnrecognisedFormat,
    /// The file looks like a snapshot but a collection is invalid.
    #[error("the backup contains an invalid collection: {0}")]
    InvalidCollection(#[source] serde_json::Error),
}

/// An exported backup, ready to be written somewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// Suggested file name, `<prefix>_Backup_<YYYY-MM-DD>.json`.
    pub file_name: String,
    /// Pretty-printed JSON.
    pub contents: String,
}

/// Loads and saves the snapshot through a [`Medium`].
#[derive(Debug)]
pub struct Gateway<M> {
    medium: M,
    snapshot_key: String,
}

impl<M: Medium> Gateway<M> {
    /// Creates a gateway storing the snapshot under the given key.
    pub fn new(medium: M, snapshot_key: impl Into<String>) -> Self {
        Self {
            medium,
            snapshot_key: snapshot_key.into(),
        }
    }

    /// The underlying medium.
    pub const fn medium(&self) -> &M {
        &self.medium
    }

    /// Loads the stored snapshot, recomputing every cached status.
    ///
    /// Returns `Ok(None)` if there is no snapshot yet.
    ///
    /// # Errors
    ///
    /// Returns an error if a snapshot exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<Store>, LoadError> {
        let Some(contents) = self.medium.read(&self.snapshot_key)? else {
            tracing::debug!("No snapshot stored under '{}'", self.snapshot_key);
            return Ok(None);
        };

        let snapshot: Snapshot = serde_json::from_str(&contents)?;
        Ok(Some(Store::from(snapshot)))
    }

    /// The key the snapshot is stored under.
    #[must_use]
    pub fn snapshot_key(&self) -> &str {
        &self.snapshot_key
    }

    /// Writes the whole store as the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized or written.
    pub fn save(&self, store: &Store) -> Result<(), SaveError> {
        let contents = serde_json::to_string(&Snapshot::from(store))?;
        self.medium.write(&self.snapshot_key, &contents)?;
        tracing::debug!("Saved snapshot to '{}'", self.snapshot_key);
        Ok(())
    }

    /// Loads the persisted notification state.
    ///
    /// Missing or unreadable state yields a fresh center.
    pub fn load_notifications(&self) -> NotificationCenter {
        self.medium
            .read(STATE_KEY)
            .ok()
            .flatten()
            .and_then(|contents| {
                serde_json::from_str(&contents)
                    .inspect_err(|e| tracing::debug!("Ignoring unreadable state: {e}"))
                    .ok()
            })
            .unwrap_or_default()
    }

    /// Persists the notification state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized or written.
    pub fn save_notifications(&self, center: &NotificationCenter) -> Result<(), SaveError> {
        let contents = serde_json::to_string(center)?;
        self.medium.write(STATE_KEY, &contents)?;
        Ok(())
    }
}

/// Renders the store as a downloadable backup.
///
/// # Errors
///
/// Returns an error if the store cannot be serialized.
pub fn export_snapshot(
    store: &Store,
    prefix: &str,
    now: DateTime<Utc>,
) -> Result<Export, SaveError> {
    let backup = Backup {
        snapshot: Snapshot::from(store),
        backup_date: now,
    };

    Ok(Export {
        file_name: format!("{prefix}_Backup_{}.json", now.format("%Y-%m-%d")),
        contents: serde_json::to_string_pretty(&backup)?,
    })
}

/// Parses an uploaded backup into a new store.
///
/// The document must be a JSON object in which at least one of
/// `commercialLicenses`, `leaseContracts`, `operationalLicenses` or
/// `procedures` is an array. Every collection is then read, missing ones as
/// empty, and every cached status is recomputed.
///
/// # Errors
///
/// Returns an error if the document is not JSON, is not recognisably a
/// snapshot, or holds a collection that cannot be read.
pub fn import_snapshot(contents: &str) -> Result<Store, ImportError> {
    let value: serde_json::Value =
        serde_json::from_str(contents).map_err(ImportError::Malformed)?;

    let recognised = value.as_object().is_some_and(|object| {
        RECOGNISED_KEYS
            .iter()
            .any(|key| object.get(*key).is_some_and(serde_json::Value::is_array))
    });
    if !recognised {
        return Err(ImportError::UnrecognisedFormat);
    }

    let snapshot: Snapshot =
        serde_json::from_value(value).map_err(ImportError::InvalidCollection)?;
    Ok(Store::from(snapshot))
}
