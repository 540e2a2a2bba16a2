//! Foyer Core - Device types, known-device store, and presence registry
//!
//! This crate provides the foundational pieces of the Foyer system:
//! - Device types shared between the scanner, daemon, and display client
//! - The Known-Device Store: a durable, priority-ordered device catalogue
//! - The Presence Registry: merges scan batches into the served snapshot

pub mod device;
pub mod registry;
pub mod store;

pub use device::{
    default_preferences, mac_key, sanitize_hostname, KnownDevice, ObservedDevice, PrefValue,
    Preferences, PresenceRecord, PLACEHOLDER_NAME,
};
pub use registry::{IngestSummary, PresenceRegistry};
pub use store::{KnownDeviceStore, StoreError};
