//! Platform capability traits and their shipped implementations.
//!
//! The router is platform-agnostic; everything platform-specific sits
//! behind two traits the host provides:
//!
//! - [`HardwareKeystore`] — the secure-enclave-backed keystore, when one
//!   exists (iOS Keychain, Android Keystore, TPM-backed stores).
//! - [`FallbackStore`] — a durable key/value store with no hardware
//!   backing. For secure keys it only ever receives sealed envelopes.
//!
//! [`FileFallbackStore`] is a ready-made fallback implementation;
//! [`memory`] holds in-memory implementations with fault injection for
//! tests.

mod fallback;
mod hardware;
pub mod memory;

pub use fallback::{FallbackStore, FileFallbackStore};
pub use hardware::HardwareKeystore;
