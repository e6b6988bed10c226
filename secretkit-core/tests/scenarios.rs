//! End-to-end scenarios for the tiered secret store.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use secretkit_core::envelope::Envelope;
use secretkit_core::platform::memory::{MemoryFallbackStore, MemoryHardwareStore};
use secretkit_core::platform::{FallbackStore, HardwareKeystore};
use secretkit_core::{MigrationCoordinator, SecretStore, StoreError};

struct Harness {
    hardware: Arc<MemoryHardwareStore>,
    fallback: Arc<MemoryFallbackStore>,
    store: Arc<SecretStore>,
}

impl Harness {
    fn new() -> Self {
        let hardware = Arc::new(MemoryHardwareStore::new());
        let fallback = Arc::new(MemoryFallbackStore::new());
        let store = Arc::new(SecretStore::new(
            Arc::clone(&hardware) as Arc<dyn HardwareKeystore>,
            Arc::clone(&fallback) as Arc<dyn FallbackStore>,
            "install-0001",
        ));
        Self {
            hardware,
            fallback,
            store,
        }
    }

    fn coordinator(&self) -> MigrationCoordinator {
        MigrationCoordinator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.fallback) as Arc<dyn FallbackStore>,
        )
    }
}

/// Scenario A: with the hardware backend available, a secure value lands in
/// hardware storage and the encryption path is never touched.
#[test]
fn hardware_path_skips_encryption_entirely() {
    let h = Harness::new();

    h.store.set_item("secure.session_token", "abc.def.ghi").unwrap();
    assert_eq!(
        h.store.get_item("secure.session_token").unwrap().as_deref(),
        Some("abc.def.ghi")
    );

    assert!(h.hardware.contains("secure.session_token"));
    // No sealing happened: nothing was ever written to the fallback tier.
    assert_eq!(h.fallback.write_call_count(), 0);
    assert!(h.fallback.is_empty());
}

/// Scenario B: the hardware backend throws on write; the value falls back to
/// the sealed path and never appears verbatim in the fallback store.
#[test]
fn hardware_write_failure_falls_back_sealed() {
    let h = Harness::new();
    h.hardware.fail_writes_for("secure.session_token");

    h.store.set_item("secure.session_token", "abc.def.ghi").unwrap();

    let stored = h.fallback.raw("secure.session_token").expect("sealed record");
    assert!(Envelope::is_current(&stored));
    assert!(!stored.contains("abc.def.ghi"));
    assert!(!stored.contains(&hex::encode("abc.def.ghi")));

    assert_eq!(
        h.store.get_item("secure.session_token").unwrap().as_deref(),
        Some("abc.def.ghi")
    );
}

/// A hardware outage surfaces as unavailability, never as a tamper signal
/// against intact sealed data, and never mints a replacement master key.
#[test]
fn hardware_outage_is_not_reported_as_tampering() {
    let h = Harness::new();
    h.hardware.fail_writes_for("secure.session_token");
    h.store.set_item("secure.session_token", "abc.def.ghi").unwrap();

    // Restart with the hardware tier (and the master key it holds) down.
    let restarted = SecretStore::new(
        Arc::clone(&h.hardware) as Arc<dyn HardwareKeystore>,
        Arc::clone(&h.fallback) as Arc<dyn FallbackStore>,
        "install-0001",
    );
    h.hardware.set_available(false);
    assert!(matches!(
        restarted.get_item("secure.session_token"),
        Err(StoreError::AdapterUnavailable)
    ));

    // The sealed record is untouched and readable once hardware returns.
    h.hardware.set_available(true);
    assert_eq!(
        restarted.get_item("secure.session_token").unwrap().as_deref(),
        Some("abc.def.ghi")
    );
}

/// Scenario C: a legacy `plain:` record decodes before migration; after
/// `migrate()` the same value is stored under the current envelope version.
#[test]
fn legacy_plain_record_migrates_to_current_version() {
    let h = Harness::new();
    // Degraded hardware keeps the upgraded record observable in the
    // fallback store.
    h.hardware.set_available(false);
    let encoded = format!("plain:{}", BASE64.encode("abc.def.ghi"));
    h.fallback.insert_raw("secure.session_token", &encoded);

    assert_eq!(
        h.store.get_item("secure.session_token").unwrap().as_deref(),
        Some("abc.def.ghi")
    );

    h.coordinator().migrate().unwrap();

    let upgraded = h.fallback.raw("secure.session_token").expect("record");
    assert!(Envelope::is_current(&upgraded));
    assert_eq!(
        h.store.get_item("secure.session_token").unwrap().as_deref(),
        Some("abc.def.ghi")
    );
}

/// Fallback determinism: with hardware forced unavailable, 100 consecutive
/// write/read cycles on one key always return the last value written.
#[test]
fn fallback_tier_is_deterministic_over_repeated_cycles() {
    let h = Harness::new();
    h.hardware.set_available(false);

    for cycle in 0..100 {
        let value = format!("value-{cycle}");
        h.store.set_item("secure.refresh_token", &value).unwrap();
        assert_eq!(
            h.store.get_item("secure.refresh_token").unwrap().as_deref(),
            Some(value.as_str())
        );
    }
}

/// Batch delete resilience: a primary-adapter fault on one key removes it
/// via its fallback tier and never blocks its siblings.
#[test]
fn batch_delete_survives_per_key_faults() {
    let h = Harness::new();
    h.hardware.set_available(false);
    for key in [
        "secure.session_token",
        "secure.refresh_token",
        "secure.device_pin",
    ] {
        h.store.set_item(key, "to-delete").unwrap();
    }
    h.hardware.set_available(true);
    h.hardware.fail_deletes_for("secure.refresh_token");

    h.store
        .delete_items(&[
            "secure.session_token",
            "secure.refresh_token",
            "secure.device_pin",
        ])
        .unwrap();

    for key in [
        "secure.session_token",
        "secure.refresh_token",
        "secure.device_pin",
    ] {
        assert_eq!(h.store.get_item(key).unwrap(), None, "{key} still present");
    }
}

/// A batch reports the keys that no tier could clear, while still deleting
/// the rest.
#[test]
fn batch_delete_reports_unremovable_keys() {
    let h = Harness::new();
    h.hardware.set_available(false);
    h.store.set_item("secure.session_token", "a").unwrap();
    h.store.set_item("secure.device_pin", "b").unwrap();
    h.fallback.fail_deletes_for("secure.device_pin");

    match h
        .store
        .delete_items(&["secure.session_token", "secure.device_pin"])
    {
        Err(StoreError::BatchDeleteFailed { keys }) => {
            assert_eq!(keys, vec!["secure.device_pin".to_string()]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(h.store.get_item("secure.session_token").unwrap(), None);
}

/// Repeated migrations after a full cycle keep observable state identical.
#[test]
fn migration_is_idempotent_end_to_end() {
    let h = Harness::new();
    let encoded = format!("plain:{}", BASE64.encode("tok-1"));
    h.fallback.insert_raw("auth_token", &encoded);

    h.coordinator().migrate().unwrap();
    let value_after_first = h.store.get_item("secure.session_token").unwrap();
    let writes_after_first = h.fallback.write_call_count();
    let hardware_after_first = h.hardware.len();

    h.coordinator().migrate().unwrap();
    assert_eq!(h.store.get_item("secure.session_token").unwrap(), value_after_first);
    assert_eq!(h.fallback.write_call_count(), writes_after_first);
    assert_eq!(h.hardware.len(), hardware_after_first);
}
