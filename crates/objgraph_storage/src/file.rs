//! File-based record backend.
//!
//! Layout:
//!
//! ```text
//! <root>/
//! ├─ Pessoa/
//! │  ├─ 5f0c...e1.rec
//! │  └─ %4Ahones%40mail.rec
//! └─ Endereco/
//!    └─ ...
//! ```
//!
//! Identities are escaped so any string maps to exactly one portable file name
//! and the mapping can be reversed when listing a directory.

use crate::backend::{validate_type_name, RecordBackend, RecordKey};
use crate::error::{StorageError, StorageResult};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Default record file extension.
pub const DEFAULT_EXTENSION: &str = "rec";

/// Suffix of in-flight temporary files.
const TEMP_SUFFIX: &str = "tmp";

/// Distinguishes temporary files of concurrent writers in one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A file-per-record storage backend.
///
/// # Durability
///
/// Every write goes to a temporary file in the same directory which is then
/// renamed over the target, so a crash leaves either the old or the new
/// record. With `sync_on_write` the temporary file and the directory are
/// fsynced as well.
///
/// # Thread Safety
///
/// The backend holds no mutable state; distinct keys can be written from
/// many threads at once.
///
/// # Example
///
/// ```no_run
/// use objgraph_storage::{FileBackend, RecordBackend, RecordKey};
/// use std::path::Path;
///
/// let backend = FileBackend::open(Path::new("data")).unwrap();
/// let key = RecordKey::new("Pessoa", "p-1").unwrap();
/// backend.write(&key, "{40:{nome:{6:Carla}}}").unwrap();
/// assert!(backend.exists(&key).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
    extension: String,
    sync_on_write: bool,
}

impl FileBackend {
    /// Opens a backend rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: &Path) -> StorageResult<Self> {
        Self::with_options(root, DEFAULT_EXTENSION, true)
    }

    /// Opens a backend with an explicit file extension and sync policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is unusable or the directory cannot
    /// be created.
    pub fn with_options(root: &Path, extension: &str, sync_on_write: bool) -> StorageResult<Self> {
        if extension.is_empty()
            || extension == TEMP_SUFFIX
            || !extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(StorageError::InvalidKey(format!(
                "invalid record extension {extension:?}"
            )));
        }
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            extension: extension.to_string(),
            sync_on_write,
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file that holds the record for `key`.
    ///
    /// The mapping is deterministic and injective.
    #[must_use]
    pub fn path(&self, key: &RecordKey) -> PathBuf {
        self.type_dir(key.type_name())
            .join(format!("{}.{}", escape_id(key.id()), self.extension))
    }

    fn type_dir(&self, type_name: &str) -> PathBuf {
        self.root.join(type_name)
    }

    #[cfg(unix)]
    fn sync_dir(dir: &Path) -> StorageResult<()> {
        File::open(dir)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_dir(_dir: &Path) -> StorageResult<()> {
        Ok(())
    }
}

impl RecordBackend for FileBackend {
    fn read(&self, key: &RecordKey) -> StorageResult<Option<String>> {
        match fs::read(self.path(key)) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| StorageError::NotText(key.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &RecordKey, text: &str) -> StorageResult<()> {
        let dir = self.type_dir(key.type_name());
        fs::create_dir_all(&dir)?;

        let target = self.path(key);
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp = dir.join(format!(
            "{}.{}.{}.{}",
            escape_id(key.id()),
            std::process::id(),
            counter,
            TEMP_SUFFIX
        ));

        let result = (|| -> StorageResult<()> {
            let mut file = File::create(&temp)?;
            file.write_all(text.as_bytes())?;
            if self.sync_on_write {
                file.sync_all()?;
            }
            drop(file);
            fs::rename(&temp, &target)?;
            if self.sync_on_write {
                Self::sync_dir(&dir)?;
            }
            Ok(())
        })();

        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }
        result
    }

    fn exists(&self, key: &RecordKey) -> StorageResult<bool> {
        match fs::metadata(self.path(key)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &RecordKey) -> StorageResult<bool> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => {
                if self.sync_on_write {
                    Self::sync_dir(&self.type_dir(key.type_name()))?;
                }
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_ids(&self, type_name: &str) -> StorageResult<Vec<String>> {
        validate_type_name(type_name)?;
        let entries = match fs::read_dir(self.type_dir(type_name)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let suffix = format!(".{}", self.extension);
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(stem) = name.strip_suffix(&suffix) {
                if let Some(id) = unescape_id(stem) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Escapes an identity into a file-name stem.
///
/// Lowercase ASCII letters, digits, `-` and `_` pass through; every other
/// byte, uppercase letters included, becomes `%XX` with uppercase hex. The
/// stem therefore never contains `.`, so it cannot collide with temporary
/// files or hidden entries, and two distinct identities never map to stems
/// that differ only in case.
#[must_use]
pub fn escape_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if passes_through(byte) {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Reverses [`escape_id`]. Returns `None` for stems it could not have produced.
#[must_use]
pub fn unescape_id(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = stem.get(i + 1..i + 3)?;
                if !hex.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)) {
                    return None;
                }
                let byte = u8::from_str_radix(hex, 16).ok()?;
                if passes_through(byte) {
                    return None;
                }
                out.push(byte);
                i += 3;
            }
            b if passes_through(b) => {
                out.push(b);
                i += 1;
            }
            _ => return None,
        }
    }
    String::from_utf8(out).ok()
}

fn passes_through(byte: u8) -> bool {
    byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-' || byte == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(type_name: &str, id: &str) -> RecordKey {
        RecordKey::new(type_name, id).unwrap()
    }

    #[test]
    fn write_and_read() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let k = key("Pessoa", "p-1");

        assert_eq!(backend.read(&k).unwrap(), None);
        backend.write(&k, "{6:hello}").unwrap();
        assert_eq!(backend.read(&k).unwrap().as_deref(), Some("{6:hello}"));
    }

    #[test]
    fn write_replaces_whole_record() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let k = key("Pessoa", "p-1");

        backend.write(&k, "{6:a much longer first version}").unwrap();
        backend.write(&k, "{6:short}").unwrap();
        assert_eq!(backend.read(&k).unwrap().as_deref(), Some("{6:short}"));
    }

    #[test]
    fn path_is_deterministic() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let k = key("Pessoa", "Jhones@mail");

        assert_eq!(backend.path(&k), backend.path(&k.clone()));
        assert_eq!(
            backend.path(&k),
            dir.path().join("Pessoa").join("%4Ahones%40mail.rec")
        );
    }

    #[test]
    fn exists_and_delete_are_idempotent() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let k = key("Pessoa", "p-1");

        assert!(!backend.exists(&k).unwrap());
        assert!(!backend.delete(&k).unwrap());

        backend.write(&k, "{0:}").unwrap();
        assert!(backend.exists(&k).unwrap());
        assert!(backend.delete(&k).unwrap());
        assert!(!backend.delete(&k).unwrap());
        assert!(!backend.exists(&k).unwrap());
    }

    #[test]
    fn list_ids_reverses_escaping_and_skips_temp_files() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();

        for id in ["b", "a b", "ç/1", "x.y"] {
            backend.write(&key("Pessoa", id), "{0:}").unwrap();
        }
        backend.write(&key("Outro", "z"), "{0:}").unwrap();
        fs::write(dir.path().join("Pessoa").join("a.1.2.tmp"), "junk").unwrap();

        let ids = backend.list_ids("Pessoa").unwrap();
        assert_eq!(ids, vec!["a b", "b", "x.y", "ç/1"]);
        assert!(backend.list_ids("Vazio").unwrap().is_empty());
    }

    #[test]
    fn persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let k = key("Pessoa", "p-1");
        {
            let backend = FileBackend::open(dir.path()).unwrap();
            backend.write(&k, "{6:persistent}").unwrap();
        }
        let backend = FileBackend::open(dir.path()).unwrap();
        assert_eq!(backend.read(&k).unwrap().as_deref(), Some("{6:persistent}"));
    }

    #[test]
    fn custom_extension() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::with_options(dir.path(), "obj", false).unwrap();
        let k = key("Pessoa", "1");
        backend.write(&k, "{0:}").unwrap();
        assert!(dir.path().join("Pessoa").join("1.obj").is_file());
        assert!(FileBackend::with_options(dir.path(), "tmp", false).is_err());
        assert!(FileBackend::with_options(dir.path(), "a.b", false).is_err());
    }

    #[test]
    fn escape_roundtrip() {
        for id in ["", "plain-id_1", "with space", "ç", "%41", "../../etc", "AbC"] {
            assert_eq!(unescape_id(&escape_id(id)).as_deref(), Some(id));
        }
        assert_eq!(escape_id("Ab"), "%41b");
        assert_eq!(unescape_id("a.b"), None);
        assert_eq!(unescape_id("%4"), None);
        assert_eq!(unescape_id("Ab"), None);
        assert_eq!(unescape_id("%4a"), None);
        assert_eq!(unescape_id("%61"), None);
    }

    proptest::proptest! {
        #[test]
        fn escaped_ids_are_portable_and_reversible(id in "\\PC{1,40}") {
            let stem = escape_id(&id);
            proptest::prop_assert!(stem.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '%')));
            proptest::prop_assert_eq!(unescape_id(&stem), Some(id));
        }

        #[test]
        fn ids_differing_in_case_get_distinct_stems(a in "[A-Za-z0-9]{1,12}", b in "[A-Za-z0-9]{1,12}") {
            proptest::prop_assume!(a != b);
            proptest::prop_assert!(!escape_id(&a).eq_ignore_ascii_case(&escape_id(&b)));
        }
    }
}
