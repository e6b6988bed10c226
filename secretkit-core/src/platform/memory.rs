//! In-memory adapter implementations for testing.
//!
//! These implementations are NOT secure for production use. They exist to
//! exercise the router's tiering behavior, including forced unavailability,
//! per-key faults, and call counting.

#![allow(clippy::missing_panics_doc)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{StoreError, StoreResult};

use super::{FallbackStore, HardwareKeystore};

/// In-memory hardware keystore with switchable availability and per-key
/// fault injection.
#[derive(Default)]
pub struct MemoryHardwareStore {
    values: Mutex<HashMap<String, String>>,
    available: AtomicBool,
    failing_reads: Mutex<HashSet<String>>,
    failing_writes: Mutex<HashSet<String>>,
    failing_deletes: Mutex<HashSet<String>>,
    set_calls: AtomicU64,
}

impl MemoryHardwareStore {
    /// Creates an available, empty keystore.
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Forces the availability probe to report `available`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Makes every `get` for `key` fail until cleared.
    pub fn fail_reads_for(&self, key: &str) {
        self.failing_reads.lock().unwrap().insert(key.to_string());
    }

    /// Makes every `set` for `key` fail until cleared.
    pub fn fail_writes_for(&self, key: &str) {
        self.failing_writes.lock().unwrap().insert(key.to_string());
    }

    /// Makes every `delete` for `key` fail until cleared.
    pub fn fail_deletes_for(&self, key: &str) {
        self.failing_deletes.lock().unwrap().insert(key.to_string());
    }

    /// Number of `set` calls observed, including failed ones.
    #[must_use]
    pub fn set_call_count(&self) -> u64 {
        self.set_calls.load(Ordering::SeqCst)
    }

    /// Returns whether a value is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.lock().unwrap().contains_key(key)
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.lock().unwrap().len()
    }

    /// Returns `true` when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.lock().unwrap().is_empty()
    }
}

impl HardwareKeystore for MemoryHardwareStore {
    fn probe(&self) -> StoreResult<bool> {
        Ok(self.available.load(Ordering::SeqCst))
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::AdapterUnavailable);
        }
        if self.failing_reads.lock().unwrap().contains(key) {
            return Err(StoreError::AdapterReadFailed(format!(
                "injected read fault for {key}"
            )));
        }
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::AdapterUnavailable);
        }
        if self.failing_writes.lock().unwrap().contains(key) {
            return Err(StoreError::AdapterWriteFailed(format!(
                "injected write fault for {key}"
            )));
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::AdapterUnavailable);
        }
        if self.failing_deletes.lock().unwrap().contains(key) {
            return Err(StoreError::AdapterWriteFailed(format!(
                "injected delete fault for {key}"
            )));
        }
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

/// In-memory fallback store with write counting and raw access for
/// asserting what actually hit the persistence layer.
#[derive(Default)]
pub struct MemoryFallbackStore {
    values: Mutex<HashMap<String, String>>,
    failing_deletes: Mutex<HashSet<String>>,
    write_calls: AtomicU64,
}

impl MemoryFallbackStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw stored record for `key`, bypassing the router.
    ///
    /// Tests use this to assert that secure values only ever appear sealed.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    /// Inserts a raw record directly, bypassing the router. For fixtures.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    /// Makes every `delete` for `key` fail until cleared.
    pub fn fail_deletes_for(&self, key: &str) {
        self.failing_deletes.lock().unwrap().insert(key.to_string());
    }

    /// Number of `write` calls observed.
    #[must_use]
    pub fn write_call_count(&self) -> u64 {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.lock().unwrap().len()
    }

    /// Returns `true` when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.lock().unwrap().is_empty()
    }
}

impl FallbackStore for MemoryFallbackStore {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        if self.failing_deletes.lock().unwrap().contains(key) {
            return Err(StoreError::AdapterWriteFailed(format!(
                "injected delete fault for {key}"
            )));
        }
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}
