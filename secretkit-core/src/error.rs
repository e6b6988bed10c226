//! Error types for tiered secret storage.

use thiserror::Error;

/// Result type for secret storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the tiered secret store.
///
/// Tier-fallback errors ([`AdapterUnavailable`], [`AdapterReadFailed`],
/// [`AdapterWriteFailed`]) are recovered inside the router and only surface
/// when the final tier also fails. [`IntegrityCheckFailed`] and
/// [`EncryptionUnavailable`] always propagate to the caller.
///
/// [`AdapterUnavailable`]: StoreError::AdapterUnavailable
/// [`AdapterReadFailed`]: StoreError::AdapterReadFailed
/// [`AdapterWriteFailed`]: StoreError::AdapterWriteFailed
/// [`IntegrityCheckFailed`]: StoreError::IntegrityCheckFailed
/// [`EncryptionUnavailable`]: StoreError::EncryptionUnavailable
#[derive(Debug, Error)]
pub enum StoreError {
    /// The hardware-backed keystore is absent on this platform or build.
    #[error("hardware keystore unavailable")]
    AdapterUnavailable,

    /// A storage adapter failed to read.
    #[error("adapter read failed: {0}")]
    AdapterReadFailed(String),

    /// A storage adapter failed to write or delete.
    #[error("adapter write failed: {0}")]
    AdapterWriteFailed(String),

    /// The stored authentication tag does not match the recomputed tag.
    ///
    /// Signals tampering or corruption. Never swallowed, never treated as
    /// an absent value.
    #[error("envelope integrity check failed")]
    IntegrityCheckFailed,

    /// The random-number or hashing primitive is unusable.
    ///
    /// Fatal for writes of secure keys: the write fails rather than ever
    /// persisting plaintext.
    #[error("encryption unavailable: {0}")]
    EncryptionUnavailable(String),

    /// Malformed or truncated envelope.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Envelope version this build cannot read.
    #[error("unsupported envelope version: {0}")]
    UnsupportedEnvelopeVersion(String),

    /// Key name is not present in the classification registry.
    #[error("unknown key: {0}")]
    UnknownKey(String),

    /// Invalid caller input.
    #[error("invalid input '{parameter}': {reason}")]
    InvalidInput {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// Batch delete could not remove every key from at least one tier.
    #[error("batch delete failed for keys: {}", keys.join(", "))]
    BatchDeleteFailed {
        /// Keys still present in every tier after the batch.
        keys: Vec<String>,
    },

    /// An in-process lock was poisoned.
    #[error("lock error: {0}")]
    Lock(String),

    /// Migration marker serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}
