//! Hashing and randomness wrappers over the platform primitives.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{StoreError, StoreResult};

/// Computes the SHA-256 digest of `data`.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Fills a fixed-size buffer from the OS randomness source.
///
/// # Errors
///
/// Returns [`StoreError::EncryptionUnavailable`] when the source cannot
/// produce bytes. Callers must fail the operation rather than degrade to a
/// predictable value.
pub fn random_bytes<const N: usize>() -> StoreResult<[u8; N]> {
    let mut bytes = [0u8; N];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| StoreError::EncryptionUnavailable(err.to_string()))?;
    Ok(bytes)
}
