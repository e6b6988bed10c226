//! Self-describing envelope text format.
//!
//! Current version, the only one ever produced on writes:
//!
//! ```text
//! v2:<saltHex>:<ivHex>:<ciphertextHex>:<tagHex>
//! ```
//!
//! Read-only legacy versions accepted for migration:
//!
//! ```text
//! v1:<saltHex>:<ciphertextHex>
//! plain:<base64Value>
//! ```
//!
//! Given only the envelope string and the master key, [`crate::crypto`] can
//! fully recover the plaintext or detect tampering; no external state is
//! needed to interpret an envelope.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{StoreError, StoreResult};

/// Salt length in bytes (hex-doubled on the wire).
pub const SALT_LEN: usize = 16;

/// Nonce length in bytes, sized for XChaCha20-Poly1305.
pub const NONCE_LEN: usize = 24;

/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// A parsed envelope of any readable version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Current AEAD format.
    V2 {
        /// Per-call salt for working-key derivation.
        salt: [u8; SALT_LEN],
        /// Per-call AEAD nonce.
        nonce: [u8; NONCE_LEN],
        /// Ciphertext without the tag.
        ciphertext: Vec<u8>,
        /// AEAD authentication tag.
        tag: [u8; TAG_LEN],
    },
    /// Legacy unauthenticated counter-mode format. Decode only.
    V1 {
        /// Per-call salt for the iterated-hash working key.
        salt: [u8; SALT_LEN],
        /// Keystream-XORed ciphertext. Carries no integrity tag.
        ciphertext: Vec<u8>,
    },
    /// Legacy unencrypted format. Decode only.
    Plain {
        /// The base64-decoded value bytes.
        value: Vec<u8>,
    },
}

impl Envelope {
    /// Serializes the envelope to its wire form.
    ///
    /// The write path only ever produces [`Envelope::V2`]; the legacy arms
    /// exist so migration fixtures can fabricate old records.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::V2 {
                salt,
                nonce,
                ciphertext,
                tag,
            } => format!(
                "v2:{}:{}:{}:{}",
                hex::encode(salt),
                hex::encode(nonce),
                hex::encode(ciphertext),
                hex::encode(tag)
            ),
            Self::V1 { salt, ciphertext } => {
                format!("v1:{}:{}", hex::encode(salt), hex::encode(ciphertext))
            }
            Self::Plain { value } => format!("plain:{}", BASE64.encode(value)),
        }
    }

    /// Reports whether `raw` is in the current writable envelope version.
    #[must_use]
    pub fn is_current(raw: &str) -> bool {
        raw.starts_with("v2:")
    }

    /// Reports whether `raw` carries a version tag this build can decode.
    ///
    /// Distinguishes a malformed envelope (tagged but unparseable) from a
    /// value that was never an envelope at all.
    #[must_use]
    pub fn is_tagged(raw: &str) -> bool {
        raw.split_once(':')
            .is_some_and(|(version, _)| matches!(version, "v2" | "v1" | "plain"))
    }

    /// Parses an envelope string of any readable version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidEnvelope`] for malformed input and
    /// [`StoreError::UnsupportedEnvelopeVersion`] for version tags this
    /// build cannot read.
    pub fn decode(raw: &str) -> StoreResult<Self> {
        let (version, body) = raw
            .split_once(':')
            .ok_or_else(|| StoreError::InvalidEnvelope("missing version tag".to_string()))?;
        match version {
            "v2" => decode_v2(body),
            "v1" => decode_v1(body),
            "plain" => {
                let value = BASE64
                    .decode(body)
                    .map_err(|err| StoreError::InvalidEnvelope(format!("bad base64: {err}")))?;
                Ok(Self::Plain { value })
            }
            other => Err(StoreError::UnsupportedEnvelopeVersion(other.to_string())),
        }
    }
}

fn decode_v2(body: &str) -> StoreResult<Envelope> {
    let parts: Vec<&str> = body.split(':').collect();
    let [salt, nonce, ciphertext, tag] = parts.as_slice() else {
        return Err(StoreError::InvalidEnvelope(format!(
            "v2 expects 4 fields, got {}",
            parts.len()
        )));
    };
    Ok(Envelope::V2 {
        salt: fixed_hex(salt, "salt")?,
        nonce: fixed_hex(nonce, "iv")?,
        ciphertext: var_hex(ciphertext, "ciphertext")?,
        tag: fixed_hex(tag, "tag")?,
    })
}

fn decode_v1(body: &str) -> StoreResult<Envelope> {
    let parts: Vec<&str> = body.split(':').collect();
    let [salt, ciphertext] = parts.as_slice() else {
        return Err(StoreError::InvalidEnvelope(format!(
            "v1 expects 2 fields, got {}",
            parts.len()
        )));
    };
    Ok(Envelope::V1 {
        salt: fixed_hex(salt, "salt")?,
        ciphertext: var_hex(ciphertext, "ciphertext")?,
    })
}

fn var_hex(field: &str, label: &str) -> StoreResult<Vec<u8>> {
    hex::decode(field)
        .map_err(|err| StoreError::InvalidEnvelope(format!("bad hex in {label}: {err}")))
}

fn fixed_hex<const N: usize>(field: &str, label: &str) -> StoreResult<[u8; N]> {
    let bytes = var_hex(field, label)?;
    if bytes.len() != N {
        return Err(StoreError::InvalidEnvelope(format!(
            "{label} length mismatch: expected {N}, got {}",
            bytes.len()
        )));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}
