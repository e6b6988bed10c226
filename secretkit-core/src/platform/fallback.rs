//! Durable fallback store with no hardware backing.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::error::{StoreError, StoreResult};

/// Durable key/value store used when the hardware path is unavailable.
///
/// For keys classified `Secure` this store only ever receives sealed
/// envelope strings; the router never hands it plaintext secret material.
/// Public keys and migration bookkeeping are stored as-is.
pub trait FallbackStore: Send + Sync {
    /// Reads the record stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure. Absence is `Ok(None)`.
    fn read(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes `value` under `key`, replacing any existing record.
    ///
    /// Writes must be atomic: after a crash the record is either the old
    /// content or the new content, never a partial state.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    fn write(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes the record under `key`. Removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error only for actual I/O failures.
    fn delete(&self, key: &str) -> StoreResult<()>;
}

/// File-per-record fallback store.
///
/// Each record lives at `<dir>/<key>.rec`. Writes go to a temporary file,
/// are synced, then renamed over the target, so a crash mid-write cannot
/// leave a torn record behind.
pub struct FileFallbackStore {
    dir: PathBuf,
}

impl FileFallbackStore {
    /// Creates a store rooted at `dir`. The directory is created on first
    /// write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.rec"))
    }
}

impl FallbackStore for FileFallbackStore {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.record_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::AdapterReadFailed(format!("{key}: {err}"))),
        }
    }

    fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        let write_err = |err: std::io::Error| StoreError::AdapterWriteFailed(format!("{key}: {err}"));
        fs::create_dir_all(&self.dir).map_err(write_err)?;

        let path = self.record_path(key);
        let tmp_path = self.dir.join(format!("{key}.rec.tmp"));
        let mut file = fs::File::create(&tmp_path).map_err(write_err)?;
        file.write_all(value.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);
        fs::rename(&tmp_path, &path).map_err(write_err)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::AdapterWriteFailed(format!("{key}: {err}"))),
        }
    }
}
