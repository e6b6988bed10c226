//! Tiered persistence for a small set of highly sensitive scalar secrets.
//!
//! `secretkit-core` stores named secrets (session credentials, biometric
//! unlock material, PIN codes) across process restarts on platforms whose
//! hardware-backed keystore may be absent, flaky, or missing from a build
//! entirely. The contract under that uncertainty:
//!
//! - A secure value is never silently persisted in the clear. When the
//!   hardware tier is unusable the value is sealed into an authenticated
//!   envelope first; if sealing itself fails, the write fails.
//! - A stored envelope that fails authentication is reported as
//!   [`StoreError::IntegrityCheckFailed`], never returned as data and never
//!   treated as an absent value.
//! - Legacy records migrate into the managed path exactly once, with no
//!   window in which a value can be lost.
//!
//! # Architecture
//!
//! [`SecretStore`] is the sole public storage surface. It routes each
//! operation across two tiers in a fixed order: the platform's
//! [`HardwareKeystore`], then a [`FallbackStore`] wrapped by the
//! encryption engine in [`crypto`]. The [`MigrationCoordinator`] moves
//! legacy records into that managed path on startup.
//!
//! Key names are partitioned by the static registry in [`classification`];
//! only registered names are accepted.
//!
//! [`HardwareKeystore`]: platform::HardwareKeystore
//! [`FallbackStore`]: platform::FallbackStore

pub mod classification;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod master_key;
pub mod migration;
pub mod platform;
pub mod primitives;
pub mod router;

pub use classification::{classify, KeyClass};
pub use crypto::MasterKey;
pub use error::{StoreError, StoreResult};
pub use master_key::MasterKeyProvider;
pub use migration::MigrationCoordinator;
pub use router::SecretStore;
