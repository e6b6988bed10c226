//! Encryption engine: pure seal/open around XChaCha20-Poly1305.
//!
//! `seal` draws a fresh salt and nonce for every call, derives a per-call
//! working key with HKDF-SHA256 over `master ‖ salt`, and carries the AEAD
//! tag as the envelope's final field. `open` authenticates before releasing
//! any plaintext: a tag mismatch is [`StoreError::IntegrityCheckFailed`]
//! and no partial plaintext ever escapes.
//!
//! Legacy `v1` envelopes (iterated-hash counter mode, no tag) and `plain`
//! records decode for migration only and are never produced on new writes.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::envelope::{Envelope, NONCE_LEN, SALT_LEN, TAG_LEN};
use crate::error::{StoreError, StoreResult};
use crate::primitives;

/// Master key length in bytes.
pub const MASTER_KEY_LEN: usize = 32;

const WORKING_KEY_INFO: &[u8] = b"secretkit:envelope-key";

/// Rounds of the v1 key-strengthening loop. Frozen legacy constant; existing
/// envelopes become unreadable if it changes.
const LEGACY_KDF_ROUNDS: u32 = 1000;

/// The per-install symmetric key all sealed envelopes derive from.
///
/// Created once per install, never rotated or deleted by this layer. It
/// exists unwrapped only transiently in process memory during a seal/open
/// call; at rest it sits behind the hardware keystore or its own sealed
/// envelope. Zeroized on drop.
#[derive(Clone, Zeroize, zeroize::ZeroizeOnDrop)]
pub struct MasterKey([u8; MASTER_KEY_LEN]);

impl MasterKey {
    /// Creates a master key from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; MASTER_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Generates a fresh random master key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EncryptionUnavailable`] when the OS randomness
    /// source fails.
    pub fn generate() -> StoreResult<Self> {
        Ok(Self(primitives::random_bytes()?))
    }

    /// Returns the raw key bytes. Treat as sensitive material.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; MASTER_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey").field("key", &"[REDACTED]").finish()
    }
}

fn derive_working_key(
    master: &MasterKey,
    salt: &[u8; SALT_LEN],
) -> StoreResult<Zeroizing<[u8; 32]>> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), master.as_bytes());
    let mut key = Zeroizing::new([0u8; 32]);
    hkdf.expand(WORKING_KEY_INFO, &mut *key)
        .map_err(|_| StoreError::EncryptionUnavailable("HKDF expansion failed".to_string()))?;
    Ok(key)
}

fn aead(working_key: &[u8; 32]) -> StoreResult<XChaCha20Poly1305> {
    XChaCha20Poly1305::new_from_slice(working_key)
        .map_err(|_| StoreError::EncryptionUnavailable("bad working key length".to_string()))
}

/// Seals `plaintext` into a current-version envelope string.
///
/// Salt and nonce are freshly random on every call, never reused even for
/// identical inputs, so sealing the same value twice yields different
/// envelopes.
///
/// # Errors
///
/// Returns [`StoreError::EncryptionUnavailable`] when randomness or the
/// cipher is unusable. The caller must fail the write; this error is never
/// downgraded to plaintext storage.
pub fn seal(master: &MasterKey, plaintext: &str) -> StoreResult<String> {
    let salt = primitives::random_bytes::<SALT_LEN>()?;
    let nonce = primitives::random_bytes::<NONCE_LEN>()?;
    let working_key = derive_working_key(master, &salt)?;

    let mut sealed = aead(&working_key)?
        .encrypt(XNonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|err| StoreError::EncryptionUnavailable(err.to_string()))?;

    // AEAD output is ciphertext with the 16-byte tag appended; the envelope
    // carries them as separate fields.
    let tag_at = sealed.len() - TAG_LEN;
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&sealed[tag_at..]);
    sealed.truncate(tag_at);

    Ok(Envelope::V2 {
        salt,
        nonce,
        ciphertext: sealed,
        tag,
    }
    .encode())
}

/// Opens an envelope of any readable version back into its plaintext.
///
/// # Errors
///
/// Returns [`StoreError::IntegrityCheckFailed`] when the tag does not
/// verify, [`StoreError::InvalidEnvelope`] /
/// [`StoreError::UnsupportedEnvelopeVersion`] for malformed input, and
/// [`StoreError::EncryptionUnavailable`] when the cipher is unusable.
pub fn open(master: &MasterKey, raw: &str) -> StoreResult<String> {
    match Envelope::decode(raw)? {
        Envelope::V2 {
            salt,
            nonce,
            mut ciphertext,
            tag,
        } => {
            let working_key = derive_working_key(master, &salt)?;
            ciphertext.extend_from_slice(&tag);
            let plaintext = aead(&working_key)?
                .decrypt(XNonce::from_slice(&nonce), ciphertext.as_slice())
                .map_err(|_| StoreError::IntegrityCheckFailed)?;
            into_utf8(plaintext)
        }
        Envelope::V1 { salt, ciphertext } => open_legacy_v1(master, &salt, ciphertext),
        Envelope::Plain { value } => into_utf8(value),
    }
}

fn into_utf8(bytes: Vec<u8>) -> StoreResult<String> {
    String::from_utf8(bytes)
        .map_err(|_| StoreError::InvalidEnvelope("plaintext is not UTF-8".to_string()))
}

fn legacy_working_key(master: &MasterKey, salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; 32]> {
    let mut seed = Vec::with_capacity(MASTER_KEY_LEN + SALT_LEN);
    seed.extend_from_slice(master.as_bytes());
    seed.extend_from_slice(salt);
    let mut key = primitives::sha256(&seed);
    seed.zeroize();
    for _ in 1..LEGACY_KDF_ROUNDS {
        key = primitives::sha256(&key);
    }
    Zeroizing::new(key)
}

/// XORs `data` against the v1 counter-mode keystream in place.
fn legacy_keystream_xor(working_key: &[u8; 32], data: &mut [u8]) {
    let mut counter: u64 = 0;
    for block in data.chunks_mut(32) {
        let mut input = [0u8; 8 + 32];
        input[..8].copy_from_slice(&counter.to_le_bytes());
        input[8..].copy_from_slice(working_key);
        let stream = primitives::sha256(&input);
        for (byte, key_byte) in block.iter_mut().zip(stream.iter()) {
            *byte ^= key_byte;
        }
        counter += 1;
    }
}

fn open_legacy_v1(
    master: &MasterKey,
    salt: &[u8; SALT_LEN],
    mut ciphertext: Vec<u8>,
) -> StoreResult<String> {
    let working_key = legacy_working_key(master, salt);
    legacy_keystream_xor(&working_key, &mut ciphertext);
    into_utf8(ciphertext)
}

/// Produces a v1 envelope for migration fixtures. The write path never
/// emits this format.
#[cfg(test)]
pub(crate) fn seal_legacy_v1(master: &MasterKey, plaintext: &str) -> StoreResult<String> {
    let salt = primitives::random_bytes::<SALT_LEN>()?;
    let working_key = legacy_working_key(master, &salt);
    let mut ciphertext = plaintext.as_bytes().to_vec();
    legacy_keystream_xor(&working_key, &mut ciphertext);
    Ok(Envelope::V1 { salt, ciphertext }.encode())
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn test_key() -> MasterKey {
        MasterKey::from_bytes([0x5A; MASTER_KEY_LEN])
    }

    #[test_case("" ; "empty string")]
    #[test_case("abc.def.ghi" ; "token shaped")]
    #[test_case("pin\u{0}\u{1}\u{7f}" ; "control characters")]
    #[test_case("pässwörd-日本語-🔐" ; "multi byte")]
    fn test_seal_open_round_trip(plaintext: &str) {
        let master = test_key();
        let envelope = seal(&master, plaintext).expect("seal");
        assert!(envelope.starts_with("v2:"));
        assert_eq!(open(&master, &envelope).expect("open"), plaintext);
    }

    #[test]
    fn test_round_trip_very_long_value() {
        let master = test_key();
        let plaintext = "x".repeat(64 * 1024);
        let envelope = seal(&master, &plaintext).expect("seal");
        assert_eq!(open(&master, &envelope).expect("open"), plaintext);
    }

    #[test]
    fn test_fresh_salt_and_nonce_per_call() {
        let master = test_key();
        let first = seal(&master, "same value").expect("seal");
        let second = seal(&master, "same value").expect("seal");
        assert_ne!(first, second);
    }

    #[test]
    fn test_tamper_detection_every_byte() {
        let master = test_key();
        let envelope = seal(&master, "abc.def.ghi").expect("seal");
        let Envelope::V2 {
            salt,
            nonce,
            ciphertext,
            tag,
        } = Envelope::decode(&envelope).expect("decode")
        else {
            panic!("expected v2 envelope");
        };

        for index in 0..ciphertext.len() {
            let mut corrupted = ciphertext.clone();
            corrupted[index] ^= 0x01;
            let raw = Envelope::V2 {
                salt,
                nonce,
                ciphertext: corrupted,
                tag,
            }
            .encode();
            assert!(matches!(
                open(&master, &raw),
                Err(StoreError::IntegrityCheckFailed)
            ));
        }

        for index in 0..tag.len() {
            let mut corrupted = tag;
            corrupted[index] ^= 0x01;
            let raw = Envelope::V2 {
                salt,
                nonce,
                ciphertext: ciphertext.clone(),
                tag: corrupted,
            }
            .encode();
            assert!(matches!(
                open(&master, &raw),
                Err(StoreError::IntegrityCheckFailed)
            ));
        }
    }

    #[test]
    fn test_wrong_master_key_fails_closed() {
        let envelope = seal(&test_key(), "secret").expect("seal");
        let other = MasterKey::from_bytes([0xA5; MASTER_KEY_LEN]);
        assert!(matches!(
            open(&other, &envelope),
            Err(StoreError::IntegrityCheckFailed)
        ));
    }

    #[test]
    fn test_legacy_v1_decodes() {
        let master = test_key();
        let envelope = seal_legacy_v1(&master, "old secret").expect("seal v1");
        assert!(envelope.starts_with("v1:"));
        assert_eq!(open(&master, &envelope).expect("open"), "old secret");
    }

    #[test]
    fn test_plain_decodes() {
        let raw = Envelope::Plain {
            value: b"legacy value".to_vec(),
        }
        .encode();
        assert_eq!(open(&test_key(), &raw).expect("open"), "legacy value");
    }

    #[test]
    fn test_master_key_debug_is_redacted() {
        let rendered = format!("{:?}", test_key());
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("90")); // 0x5A
    }
}
