//! Lazy provisioning of the per-install master key.

use std::sync::{Arc, Mutex};

use hkdf::Hkdf;
use sha2::Sha256;

use crate::crypto::{self, MasterKey, MASTER_KEY_LEN};
use crate::error::{StoreError, StoreResult};
use crate::platform::{FallbackStore, HardwareKeystore};

/// Reserved hardware keystore entry holding the master key.
pub const MASTER_KEY_NAME: &str = "secretkit.master_key";

/// Reserved fallback record holding the sealed master key in degraded mode.
pub const MASTER_KEY_FALLBACK_NAME: &str = "secretkit.master_key.sealed";

/// Reserved fallback record noting which tier holds the master key.
pub const MASTER_KEY_LOCATION_NAME: &str = "secretkit.master_key.location";

const LOCATION_HARDWARE: &str = "hardware";

const WRAP_KEY_SALT: &[u8] = b"secretkit:master-key-wrap:salt";
const WRAP_KEY_INFO: &[u8] = b"secretkit:master-key-wrap";

/// Provides the per-install [`MasterKey`], creating it on first use.
///
/// Lookup order is hardware keystore, then sealed fallback record, then
/// create-and-persist. A fresh key is minted only when both tiers
/// affirmatively report it absent: a location record written at hardware
/// provisioning time lets a later start tell a transient hardware outage
/// apart from a fresh install, and during an outage the provider reports
/// [`StoreError::AdapterUnavailable`] instead of minting a replacement key
/// that would make every existing envelope unreadable.
///
/// When the hardware keystore is unavailable the fresh key is sealed under
/// a wrap key derived from the caller-supplied install identifier before it
/// touches the fallback store. That wrap key is only as secret as the
/// identifier itself: degraded-mode installs accept strictly weaker
/// protection for the master key, and callers should treat this as a
/// documented residual risk.
pub struct MasterKeyProvider {
    hardware: Arc<dyn HardwareKeystore>,
    fallback: Arc<dyn FallbackStore>,
    install_id: String,
    cached: Mutex<Option<MasterKey>>,
}

impl MasterKeyProvider {
    /// Creates a provider over the given adapters.
    ///
    /// `install_id` must be stable for the life of the install.
    pub fn new(
        hardware: Arc<dyn HardwareKeystore>,
        fallback: Arc<dyn FallbackStore>,
        install_id: impl Into<String>,
    ) -> Self {
        Self {
            hardware,
            fallback,
            install_id: install_id.into(),
            cached: Mutex::new(None),
        }
    }

    /// Returns the master key, creating and persisting it on first use.
    ///
    /// First creation is serialized: concurrent first calls block on an
    /// in-process mutex and observe the single minted key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EncryptionUnavailable`] when no key can be
    /// minted, adapter errors when neither tier can persist it,
    /// [`StoreError::AdapterUnavailable`] while the hardware tier holding
    /// the key is unreachable, and [`StoreError::IntegrityCheckFailed`]
    /// when the sealed fallback record has been tampered with.
    pub fn get_or_create(&self) -> StoreResult<MasterKey> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|err| StoreError::Lock(err.to_string()))?;
        if let Some(key) = cached.as_ref() {
            return Ok(key.clone());
        }
        let key = self.load_or_mint()?;
        *cached = Some(key.clone());
        Ok(key)
    }

    fn load_or_mint(&self) -> StoreResult<MasterKey> {
        let hardware_ready = self.hardware.probe().unwrap_or(false);

        let mut hardware_err = None;
        if hardware_ready {
            match self.hardware.get(MASTER_KEY_NAME) {
                Ok(Some(encoded)) => return parse_master_key(&encoded),
                Ok(None) => {}
                Err(err) => hardware_err = Some(err),
            }
        }

        if let Some(sealed) = self.fallback.read(MASTER_KEY_FALLBACK_NAME)? {
            let wrap_key = self.wrap_key()?;
            let encoded = crypto::open(&wrap_key, &sealed)?;
            return parse_master_key(&encoded);
        }

        // The probe passed but the read did not; the key may still exist
        // behind the hardware tier, so minting here is not safe.
        if let Some(err) = hardware_err {
            return Err(err);
        }

        // Same when the hardware tier is down but was provisioned before:
        // report the outage rather than shadow the existing key.
        if !hardware_ready && self.hardware_holds_key()? {
            return Err(StoreError::AdapterUnavailable);
        }

        let key = MasterKey::generate()?;
        let encoded = hex::encode(key.as_bytes());

        if hardware_ready {
            // Record the location before the key exists anywhere, so a
            // later outage is distinguishable from a fresh install.
            self.fallback.write(MASTER_KEY_LOCATION_NAME, LOCATION_HARDWARE)?;
            match self.hardware.set(MASTER_KEY_NAME, &encoded) {
                Ok(()) => return Ok(key),
                Err(err) => {
                    log::warn!("hardware write of master key failed, sealing to fallback: {err}");
                }
            }
        }

        let wrap_key = self.wrap_key()?;
        let sealed = crypto::seal(&wrap_key, &encoded)?;
        self.fallback.write(MASTER_KEY_FALLBACK_NAME, &sealed)?;
        Ok(key)
    }

    // A stale location record after a failed hardware write is harmless:
    // the sealed fallback record is always checked first.
    fn hardware_holds_key(&self) -> StoreResult<bool> {
        Ok(self.fallback.read(MASTER_KEY_LOCATION_NAME)?.as_deref() == Some(LOCATION_HARDWARE))
    }

    /// Derives the key that seals the master key's own fallback record.
    ///
    /// Input is the install identifier: the master key cannot wrap its own
    /// storage, and the identifier is the only stable input left in
    /// degraded mode.
    fn wrap_key(&self) -> StoreResult<MasterKey> {
        let hkdf = Hkdf::<Sha256>::new(Some(WRAP_KEY_SALT), self.install_id.as_bytes());
        let mut key = [0u8; MASTER_KEY_LEN];
        hkdf.expand(WRAP_KEY_INFO, &mut key)
            .map_err(|_| StoreError::EncryptionUnavailable("HKDF expansion failed".to_string()))?;
        Ok(MasterKey::from_bytes(key))
    }
}

fn parse_master_key(encoded: &str) -> StoreResult<MasterKey> {
    let bytes = hex::decode(encoded.trim())
        .map_err(|_| StoreError::InvalidEnvelope("master key record is not hex".to_string()))?;
    if bytes.len() != MASTER_KEY_LEN {
        return Err(StoreError::InvalidEnvelope(format!(
            "master key length mismatch: expected {MASTER_KEY_LEN}, got {}",
            bytes.len()
        )));
    }
    let mut key = [0u8; MASTER_KEY_LEN];
    key.copy_from_slice(&bytes);
    Ok(MasterKey::from_bytes(key))
}
