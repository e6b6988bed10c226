//! Tiered storage router: the crate's public storage surface.

use std::sync::Arc;

use crate::classification::{classify, KeyClass};
use crate::crypto;
use crate::error::{StoreError, StoreResult};
use crate::master_key::MasterKeyProvider;
use crate::platform::{FallbackStore, HardwareKeystore};

/// Tiered secret store: hardware keystore first, sealed fallback second.
///
/// Every operation probes the hardware tier and falls through to the
/// fallback tier in that fixed order. Secure values cross into the fallback
/// store only as sealed envelopes; a seal failure surfaces as
/// [`StoreError::EncryptionUnavailable`] and is never downgraded to
/// plaintext storage.
///
/// All state is explicit and instance-owned: construct one store at process
/// start and share it by reference. Two racing writes to the same key are
/// last-write-wins at whichever adapter commits last; callers needing
/// stronger ordering serialize at a higher layer.
pub struct SecretStore {
    hardware: Arc<dyn HardwareKeystore>,
    fallback: Arc<dyn FallbackStore>,
    master_key: MasterKeyProvider,
}

impl SecretStore {
    /// Creates a store over the given adapters.
    ///
    /// `install_id` is a stable per-install identifier; it wraps the master
    /// key when the hardware keystore is unavailable (see
    /// [`MasterKeyProvider`]).
    pub fn new(
        hardware: Arc<dyn HardwareKeystore>,
        fallback: Arc<dyn FallbackStore>,
        install_id: impl Into<String>,
    ) -> Self {
        let master_key = MasterKeyProvider::new(
            Arc::clone(&hardware),
            Arc::clone(&fallback),
            install_id,
        );
        Self {
            hardware,
            fallback,
            master_key,
        }
    }

    fn hardware_ready(&self) -> bool {
        match self.hardware.probe() {
            Ok(ready) => ready,
            Err(err) => {
                log::debug!("hardware probe failed, treating as unavailable: {err}");
                false
            }
        }
    }

    /// Stores `value` under `key`. The empty string is a valid value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidInput`] for an empty key,
    /// [`StoreError::UnknownKey`] for names outside the registry,
    /// [`StoreError::EncryptionUnavailable`] when a secure value cannot be
    /// sealed, and an adapter error when every tier failed.
    pub fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::InvalidInput {
                parameter: "key",
                reason: "must be non-empty",
            });
        }
        match classify(key)? {
            KeyClass::Public => self.fallback.write(key, value),
            KeyClass::Secure => self.set_secure(key, value),
        }
    }

    fn set_secure(&self, key: &str, value: &str) -> StoreResult<()> {
        if self.hardware_ready() {
            match self.hardware.set(key, value) {
                Ok(()) => {
                    // Clear any envelope left over from a degraded period so
                    // a later fallback read cannot resurrect a stale value.
                    if let Err(err) = self.fallback.delete(key) {
                        log::debug!("could not clear fallback copy of {key}: {err}");
                    }
                    return Ok(());
                }
                Err(err) => {
                    log::warn!("hardware write failed for {key}, using sealed fallback: {err}");
                }
            }
        }
        let master = self.master_key.get_or_create()?;
        let envelope = crypto::seal(&master, value)?;
        self.fallback.write(key, &envelope)
    }

    /// Returns the value stored under `key`, or `None` if it was never set.
    ///
    /// Absence is a normal state, not an error. Tampered or corrupted
    /// envelopes are never returned as data.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownKey`] for names outside the registry,
    /// [`StoreError::IntegrityCheckFailed`] when a stored envelope fails
    /// authentication, and an adapter error when every tier failed.
    pub fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        match classify(key)? {
            KeyClass::Public => self.fallback.read(key),
            KeyClass::Secure => self.get_secure(key),
        }
    }

    fn get_secure(&self, key: &str) -> StoreResult<Option<String>> {
        if self.hardware_ready() {
            match self.hardware.get(key) {
                Ok(Some(value)) => return Ok(Some(value)),
                // The value may sit in the fallback tier if it was written
                // during a degraded period.
                Ok(None) => {}
                Err(err) => {
                    log::warn!("hardware read failed for {key}, trying fallback: {err}");
                }
            }
        }
        let Some(envelope) = self.fallback.read(key)? else {
            return Ok(None);
        };
        self.open_envelope(&envelope).map(Some)
    }

    /// Opens a stored envelope with this store's master key.
    pub(crate) fn open_envelope(&self, raw: &str) -> StoreResult<String> {
        let master = self.master_key.get_or_create()?;
        crypto::open(&master, raw)
    }

    /// Exposes the master key so tests can fabricate legacy envelopes.
    #[cfg(test)]
    pub(crate) fn master_key_for_tests(&self) -> StoreResult<crypto::MasterKey> {
        self.master_key.get_or_create()
    }

    /// Removes `key` from every tier it exists in. Deleting an absent key
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownKey`] for names outside the registry,
    /// and an adapter error only when no tier could be cleared.
    pub fn delete_item(&self, key: &str) -> StoreResult<()> {
        classify(key)?;

        let hardware_cleared = if self.hardware_ready() {
            match self.hardware.delete(key) {
                Ok(()) => true,
                Err(err) => {
                    log::warn!("hardware delete failed for {key}: {err}");
                    false
                }
            }
        } else {
            false
        };

        match self.fallback.delete(key) {
            Ok(()) => Ok(()),
            Err(err) if hardware_cleared => {
                log::warn!("fallback delete failed for {key} after hardware tier cleared: {err}");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Removes a batch of keys, best-effort.
    ///
    /// Each key is processed independently: one key's failure never blocks
    /// deletion of its siblings, and a key whose primary tier fails is still
    /// removed via its fallback tier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BatchDeleteFailed`] naming the keys that could
    /// not be removed from any tier.
    pub fn delete_items(&self, keys: &[&str]) -> StoreResult<()> {
        let mut failed = Vec::new();
        for key in keys {
            if let Err(err) = self.delete_item(key) {
                log::warn!("batch delete failed for {key}: {err}");
                failed.push((*key).to_string());
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(StoreError::BatchDeleteFailed { keys: failed })
        }
    }
}
