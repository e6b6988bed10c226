//! Hardware-backed keystore capability trait.

use crate::error::StoreResult;

/// Capability-checked access to the platform's secure-enclave keystore.
///
/// Host platforms implement this over Keychain Services, Android Keystore,
/// or an equivalent service; the hardware layer supplies its own at-rest
/// protection, so values cross this boundary as plaintext.
///
/// [`probe`] is a cheap availability check and is itself fallible. A `true`
/// probe is a hint, not a guarantee: any operation may still fail
/// transiently, and the router treats such failures as a cue to fall back,
/// never as data loss.
///
/// [`probe`]: HardwareKeystore::probe
pub trait HardwareKeystore: Send + Sync {
    /// Reports whether the hardware path is usable right now.
    ///
    /// # Errors
    ///
    /// Returns an error when availability cannot be determined; callers
    /// treat that the same as `Ok(false)`.
    fn probe(&self) -> StoreResult<bool>;

    /// Reads the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error on transient keystore failure. Absence is
    /// `Ok(None)`, not an error.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error when the keystore refuses the write.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes `key`. Removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error only for actual keystore failures.
    fn delete(&self, key: &str) -> StoreResult<()>;
}
