//! Database directory management.
//!
//! This module handles the file system layout for objgraph:
//!
//! ```text
//! <db_path>/
//! ├─ TYPES             # Registered type name -> index table
//! ├─ LOCK              # Advisory lock for single-process ownership
//! └─ records/
//!    └─ <Type>/
//!       └─ <id>.rec    # One record per entity
//! ```
//!
//! The LOCK file ensures only one process owns the database at a time.
//! The TYPES file persists type indices across restarts.

use crate::error::{CoreError, CoreResult};
use crate::manifest::TypeManifest;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "TYPES";
const MANIFEST_TEMP: &str = "TYPES.tmp";
const LOCK_FILE: &str = "LOCK";
const RECORDS_DIR: &str = "records";

/// Manages the database directory structure and file locking.
///
/// While a `DatabaseDir` opened with locking is alive, no other process can
/// open the same directory.
#[derive(Debug)]
pub struct DatabaseDir {
    path: PathBuf,
    _lock_file: Option<File>,
}

impl DatabaseDir {
    /// Opens or creates a database directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another process holds the lock (returns `DatabaseLocked`)
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool, lock: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_format(format!(
                    "database directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = if lock {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path.join(LOCK_FILE))?;
            if file.try_lock_exclusive().is_err() {
                return Err(CoreError::DatabaseLocked);
            }
            Some(file)
        } else {
            None
        };

        fs::create_dir_all(path.join(RECORDS_DIR))?;

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the path to the database directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the directory holding the record files.
    #[must_use]
    pub fn records_dir(&self) -> PathBuf {
        self.path.join(RECORDS_DIR)
    }

    /// Returns the path to the TYPES file.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(MANIFEST_FILE)
    }

    /// Loads the type manifest.
    ///
    /// Returns `None` if the file doesn't exist (new database).
    pub fn load_manifest(&self) -> CoreResult<Option<TypeManifest>> {
        let text = match fs::read_to_string(self.manifest_path()) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if text.is_empty() {
            return Ok(None);
        }
        TypeManifest::decode(&text).map(Some)
    }

    /// Saves the type manifest atomically.
    ///
    /// Writes a temporary file, syncs it, renames it over TYPES and syncs the
    /// directory so the rename survives a crash.
    pub fn save_manifest(&self, manifest: &TypeManifest) -> CoreResult<()> {
        let temp_path = self.path.join(MANIFEST_TEMP);

        let mut file = File::create(&temp_path)?;
        file.write_all(manifest.encode().as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, self.manifest_path())?;
        self.sync_directory()
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> CoreResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> CoreResult<()> {
        // NTFS journals metadata; directories cannot be fsynced.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("new_db");

        let dir = DatabaseDir::open(&db_path, true, true).unwrap();
        assert!(db_path.join(LOCK_FILE).exists());
        assert!(dir.records_dir().is_dir());
    }

    #[test]
    fn open_without_create_fails() {
        let temp = tempdir().unwrap();
        let result = DatabaseDir::open(&temp.path().join("missing"), false, true);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn lock_prevents_second_open() {
        let temp = tempdir().unwrap();
        let _first = DatabaseDir::open(temp.path(), true, true).unwrap();
        let second = DatabaseDir::open(temp.path(), true, true);
        assert!(matches!(second, Err(CoreError::DatabaseLocked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        drop(DatabaseDir::open(temp.path(), true, true).unwrap());
        assert!(DatabaseDir::open(temp.path(), true, true).is_ok());
    }

    #[test]
    fn manifest_save_load() {
        let temp = tempdir().unwrap();
        let dir = DatabaseDir::open(temp.path(), true, false).unwrap();
        assert!(dir.load_manifest().unwrap().is_none());

        let mut manifest = TypeManifest::new();
        manifest.insert("Pessoa", 32);
        dir.save_manifest(&manifest).unwrap();

        assert_eq!(dir.load_manifest().unwrap(), Some(manifest));
        assert!(!temp.path().join(MANIFEST_TEMP).exists());
    }
}
