//! Object storage: whole-object reads and conditional whole-object writes.
//!
//! A bucket maps keys to byte blobs. Every stored object carries an ETag, the
//! lowercase hex SHA-256 of its bytes, and every write names the state it
//! expects to overwrite:
//!
//!   None          unconditional overwrite
//!   IfMatch(tag)  the object must exist with exactly this ETag
//!   IfAbsent      the object must not exist
//!
//! A violated precondition is reported as `WmmError::WriteConflict` and
//! leaves the stored object untouched.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use tracing::debug;

use wmm_contracts::error::{WmmError, WmmResult};

/// Compute the ETag of `bytes`: lowercase hex SHA-256.
pub fn etag(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// An object read from a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub etag: String,
}

impl StoredObject {
    pub fn new(bytes: Vec<u8>) -> Self {
        let etag = etag(&bytes);
        Self { bytes, etag }
    }
}

/// The state a write expects to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    None,
    IfMatch(String),
    IfAbsent,
}

impl Precondition {
    /// Check `self` against the current ETag of the target object.
    fn check(&self, key: &str, current: Option<&str>) -> WmmResult<()> {
        let ok = match (self, current) {
            (Precondition::None, _) => true,
            (Precondition::IfMatch(expected), Some(found)) => expected == found,
            (Precondition::IfMatch(_), None) => false,
            (Precondition::IfAbsent, current) => current.is_none(),
        };
        if ok {
            return Ok(());
        }
        Err(WmmError::WriteConflict {
            key: key.to_string(),
            expected: match self {
                Precondition::None => "*".to_string(),
                Precondition::IfMatch(tag) => tag.clone(),
                Precondition::IfAbsent => "<absent>".to_string(),
            },
            found: current.unwrap_or("<absent>").to_string(),
        })
    }
}

/// A flat key → bytes bucket with conditional writes.
pub trait ObjectStore: Send + Sync {
    /// Read the object at `key`, or `None` if there is none.
    fn get(&self, key: &str) -> WmmResult<Option<StoredObject>>;

    /// Write `bytes` to `key` if `precondition` holds. Returns the new ETag.
    fn put(&self, key: &str, bytes: &[u8], precondition: Precondition) -> WmmResult<String>;

    /// Bucket name or location, for log lines.
    fn bucket(&self) -> String;
}

// ── In-memory bucket ──────────────────────────────────────────────────────────

/// A bucket held in memory. Clones share the same objects.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects in the bucket.
    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn get(&self, key: &str) -> WmmResult<Option<StoredObject>> {
        let objects = self.objects.lock().map_err(|e| WmmError::StorageRead {
            key: key.to_string(),
            reason: format!("bucket lock poisoned: {e}"),
        })?;
        Ok(objects.get(key).cloned().map(StoredObject::new))
    }

    fn put(&self, key: &str, bytes: &[u8], precondition: Precondition) -> WmmResult<String> {
        let mut objects = self.objects.lock().map_err(|e| WmmError::StorageWrite {
            key: key.to_string(),
            reason: format!("bucket lock poisoned: {e}"),
        })?;
        let current = objects.get(key).map(|b| etag(b));
        precondition.check(key, current.as_deref())?;

        objects.insert(key.to_string(), bytes.to_vec());
        Ok(etag(bytes))
    }

    fn bucket(&self) -> String {
        "memory".to_string()
    }
}

// ── Filesystem bucket ─────────────────────────────────────────────────────────

/// A bucket rooted at a directory; keys are relative paths beneath it.
///
/// Writes go to a temporary file in the target directory and are renamed
/// into place, so readers see either the old or the new object. The
/// precondition check and the rename happen under one lock, which makes
/// conditional writes atomic among users of the same `FsObjectStore`
/// (and its clones) in this process.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `key` under the root. Absolute keys and `..` are refused.
    fn path_for(&self, key: &str) -> Option<PathBuf> {
        let rel = Path::new(key);
        if key.is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.root.join(rel))
    }

    fn read(&self, key: &str, path: &Path) -> WmmResult<Option<StoredObject>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(StoredObject::new(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WmmError::StorageRead {
                key: key.to_string(),
                reason: format!("failed to read '{}': {e}", path.display()),
            }),
        }
    }
}

impl ObjectStore for FsObjectStore {
    fn get(&self, key: &str) -> WmmResult<Option<StoredObject>> {
        let path = self.path_for(key).ok_or_else(|| WmmError::StorageRead {
            key: key.to_string(),
            reason: "invalid object key".to_string(),
        })?;
        self.read(key, &path)
    }

    fn put(&self, key: &str, bytes: &[u8], precondition: Precondition) -> WmmResult<String> {
        let write_err = |reason: String| WmmError::StorageWrite {
            key: key.to_string(),
            reason,
        };

        let path = self
            .path_for(key)
            .ok_or_else(|| write_err("invalid object key".to_string()))?;
        let dir = path
            .parent()
            .ok_or_else(|| write_err("object key has no parent directory".to_string()))?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| write_err(format!("write lock poisoned: {e}")))?;

        let current = self.read(key, &path)?.map(|o| o.etag);
        precondition.check(key, current.as_deref())?;

        fs::create_dir_all(dir)
            .map_err(|e| write_err(format!("failed to create '{}': {e}", dir.display())))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| write_err(format!("failed to create temporary file: {e}")))?;
        tmp.write_all(bytes)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| write_err(format!("failed to write temporary file: {e}")))?;
        tmp.persist(&path)
            .map_err(|e| write_err(format!("failed to move object into place: {e}")))?;

        let tag = etag(bytes);
        debug!(key = %key, etag = %tag, bytes = bytes.len(), "object written");
        Ok(tag)
    }

    fn bucket(&self) -> String {
        self.root.display().to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use wmm_contracts::error::WmmError;

    use super::{etag, FsObjectStore, InMemoryObjectStore, ObjectStore, Precondition};

    #[test]
    fn etag_is_lowercase_sha256_hex() {
        assert_eq!(
            etag(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    fn exercise_preconditions(store: &dyn ObjectStore) {
        assert!(store.get("log.csv").unwrap().is_none());

        let v1 = store.put("log.csv", b"a", Precondition::IfAbsent).unwrap();
        assert_eq!(v1, etag(b"a"));

        // Creating twice conflicts.
        let err = store.put("log.csv", b"b", Precondition::IfAbsent).unwrap_err();
        assert!(matches!(err, WmmError::WriteConflict { .. }));

        let v2 = store
            .put("log.csv", b"ab", Precondition::IfMatch(v1.clone()))
            .unwrap();

        // A stale tag conflicts and leaves the object alone.
        match store.put("log.csv", b"ac", Precondition::IfMatch(v1.clone())) {
            Err(WmmError::WriteConflict { expected, found, .. }) => {
                assert_eq!(expected, v1);
                assert_eq!(found, v2);
            }
            other => panic!("expected WriteConflict, got {other:?}"),
        }
        let current = store.get("log.csv").unwrap().unwrap();
        assert_eq!(current.bytes, b"ab");
        assert_eq!(current.etag, v2);

        // IfMatch on a missing object conflicts too.
        assert!(store
            .put("other.csv", b"x", Precondition::IfMatch(v2))
            .is_err());

        store.put("log.csv", b"z", Precondition::None).unwrap();
        assert_eq!(store.get("log.csv").unwrap().unwrap().bytes, b"z");
    }

    #[test]
    fn in_memory_store_honours_preconditions() {
        exercise_preconditions(&InMemoryObjectStore::new());
    }

    #[test]
    fn in_memory_clones_share_objects() {
        let a = InMemoryObjectStore::new();
        let b = a.clone();
        a.put("k", b"v", Precondition::None).unwrap();
        assert_eq!(b.get("k").unwrap().unwrap().bytes, b"v");
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn fs_store_honours_preconditions() {
        let dir = tempfile::tempdir().unwrap();
        exercise_preconditions(&FsObjectStore::new(dir.path()));
    }

    #[test]
    fn fs_store_creates_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        store.put("class/a/log.csv", b"rows", Precondition::None).unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("class/a/log.csv")).unwrap(),
            b"rows"
        );
    }

    #[test]
    fn fs_store_refuses_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        assert!(matches!(
            store.put("../escape.csv", b"x", Precondition::None),
            Err(WmmError::StorageWrite { .. })
        ));
        assert!(matches!(
            store.get("/etc/passwd"),
            Err(WmmError::StorageRead { .. })
        ));
    }
}
