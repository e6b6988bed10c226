//! One-shot, idempotent migration of legacy records into the managed path.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::{StoreError, StoreResult};
use crate::platform::FallbackStore;
use crate::router::SecretStore;

/// A legacy record scheduled for migration into the router-managed path.
pub struct LegacyKey {
    /// Name the value was stored under by older releases.
    pub legacy_name: &'static str,
    /// Registered name the value moves to.
    pub new_name: &'static str,
    /// Marker recording that this key's migration has completed. Lives in
    /// the `Public` partition so its bookkeeping never depends on the
    /// secure path being available.
    pub marker_name: &'static str,
}

/// Legacy records known to this build.
pub const LEGACY_KEYS: &[LegacyKey] = &[
    LegacyKey {
        legacy_name: "auth_token",
        new_name: "secure.session_token",
        marker_name: "migration.auth_token.done",
    },
    LegacyKey {
        legacy_name: "refresh_token",
        new_name: "secure.refresh_token",
        marker_name: "migration.refresh_token.done",
    },
    LegacyKey {
        legacy_name: "user_pin",
        new_name: "secure.device_pin",
        marker_name: "migration.user_pin.done",
    },
];

#[derive(Debug, Serialize, Deserialize)]
struct MigrationMarker {
    migrated_at: u64,
}

/// Moves legacy records into the router-managed path.
///
/// Safe to run unconditionally on every process start. Per key the order is
/// read legacy, write through the router (a fresh seal under the current
/// scheme), delete legacy, set marker — so a crash at any point leaves
/// either the legacy value still present and unmigrated, or a fully
/// migrated value with the marker set. Never a lost value.
pub struct MigrationCoordinator {
    store: Arc<SecretStore>,
    legacy: Arc<dyn FallbackStore>,
}

impl MigrationCoordinator {
    /// Creates a coordinator reading legacy records and markers from
    /// `legacy` and writing migrated values through `store`.
    pub fn new(store: Arc<SecretStore>, legacy: Arc<dyn FallbackStore>) -> Self {
        Self { store, legacy }
    }

    /// Migrates every known legacy key that has not been migrated yet.
    ///
    /// A second run performs no writes: each completed key is skipped via
    /// its marker before any storage is touched.
    ///
    /// # Errors
    ///
    /// Returns the first per-key failure. The failed key's legacy record is
    /// left in place and is retried on the next run.
    pub fn migrate(&self) -> StoreResult<()> {
        for key in LEGACY_KEYS {
            self.migrate_key(key)?;
        }
        self.upgrade_in_place()
    }

    /// Re-seals records that already sit under a registered secure name but
    /// in an older format (a `plain:` record or a `v1` envelope).
    ///
    /// Idempotence comes from format inspection: a record already in the
    /// current version is skipped without any write.
    fn upgrade_in_place(&self) -> StoreResult<()> {
        for key in crate::classification::SECURE_KEYS {
            let Some(raw) = self.legacy.read(key)? else {
                continue;
            };
            if Envelope::is_current(&raw) {
                continue;
            }
            let value = self.store.decode_record(&raw)?;
            self.store.set_item(key, &value)?;
            log::info!("upgraded {key} to the current envelope version");
        }
        Ok(())
    }

    fn migrate_key(&self, key: &LegacyKey) -> StoreResult<()> {
        if self.legacy.read(key.marker_name)?.is_some() {
            return Ok(());
        }

        if let Some(raw) = self.legacy.read(key.legacy_name)? {
            let value = self.store.decode_record(&raw)?;
            self.store.set_item(key.new_name, &value)?;
            self.legacy.delete(key.legacy_name)?;
            log::info!("migrated {} to {}", key.legacy_name, key.new_name);
        }

        self.write_marker(key.marker_name)
    }

    fn write_marker(&self, marker_name: &str) -> StoreResult<()> {
        let marker = MigrationMarker {
            migrated_at: now_unix(),
        };
        let json = serde_json::to_string(&marker)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        self.legacy.write(marker_name, &json)
    }
}

impl SecretStore {
    /// Decodes a legacy record of any readable shape.
    ///
    /// Older releases stored values as `plain:` records, `v1` envelopes, or
    /// bare unwrapped strings. Only a record with no recognized version tag
    /// is treated as a bare value; a tagged record that fails to parse is
    /// corruption and propagates its decode error, so migration leaves it
    /// in place instead of re-sealing garbage.
    pub(crate) fn decode_record(&self, raw: &str) -> StoreResult<String> {
        if !Envelope::is_tagged(raw) {
            return Ok(raw.to_string());
        }
        self.open_envelope(raw)
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}
