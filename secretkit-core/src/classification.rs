//! Static partition of logical key names into `Secure` and `Public`.
//!
//! Every caller-visible key must appear in exactly one of the two sets
//! below. Secure names carry the `secure.` namespace marker so the
//! partition can be audited by inspection, and the sets' disjointness is
//! enforced by a unit test.

use crate::error::{StoreError, StoreResult};

/// Namespace marker carried by every secure key name.
pub const SECURE_PREFIX: &str = "secure.";

/// Keys whose values never reach the fallback store unsealed.
pub const SECURE_KEYS: &[&str] = &[
    "secure.session_token",
    "secure.refresh_token",
    "secure.biometric_key",
    "secure.device_pin",
];

/// Keys stored without encryption.
///
/// Bookkeeping for the secure path (migration markers) lives here so it
/// never depends on the secure path being available.
pub const PUBLIC_KEYS: &[&str] = &[
    "install.first_run_at",
    "migration.auth_token.done",
    "migration.refresh_token.done",
    "migration.user_pin.done",
];

/// Storage class of a logical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    /// Sensitive: hardware tier first, sealed envelope on fallback.
    Secure,
    /// Non-sensitive: plain fallback storage, no crypto path.
    Public,
}

/// Resolves `key` against the registry.
///
/// # Errors
///
/// Returns [`StoreError::UnknownKey`] for names outside the registry, so
/// the `secure.` namespace cannot be reached with arbitrary strings.
pub fn classify(key: &str) -> StoreResult<KeyClass> {
    if SECURE_KEYS.contains(&key) {
        return Ok(KeyClass::Secure);
    }
    if PUBLIC_KEYS.contains(&key) {
        return Ok(KeyClass::Public);
    }
    Err(StoreError::UnknownKey(key.to_string()))
}
