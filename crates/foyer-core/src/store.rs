//! Known-Device Store: the durable, priority-ordered device catalogue
//!
//! The store is two structures that must never diverge: a MAC-keyed
//! catalogue and a separate ordering sequence of MAC keys whose index is
//! the device's priority (0 = highest, greeted first). `priority` on the
//! device record is always recomputed from the ordering sequence, never
//! edited directly.
//!
//! Persistence is a CSV table with columns `mac,name,preferences`
//! (preferences as an embedded JSON object), row order = priority order.
//! The file is rewritten in full on every mutation so a restart replays
//! the same order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

use crate::device::{
    default_preferences, mac_key, sanitize_hostname, KnownDevice, ObservedDevice, Preferences,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unknown device: {0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("failed to access device table: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse device table: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to encode preferences: {0}")]
    Json(#[from] serde_json::Error),
}

/// One row of the persisted device table.
#[derive(Debug, Serialize, Deserialize)]
struct DeviceRow {
    mac: String,
    name: String,
    preferences: String,
}

/// Durable catalogue of known devices and their priority order.
#[derive(Debug)]
pub struct KnownDeviceStore {
    path: PathBuf,
    /// Catalogue keyed by lowercase MAC
    devices: HashMap<String, KnownDevice>,
    /// Ordering sequence of lowercase MACs; index = priority
    order: Vec<String>,
}

impl KnownDeviceStore {
    /// Create an empty store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            devices: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Reconstruct the catalogue and ordering sequence from disk.
    ///
    /// Row order becomes priority order. A row whose preferences cell
    /// fails to parse degrades to an empty preference set; a file that
    /// cannot be read or parsed at all returns an error and leaves the
    /// current in-memory state untouched.
    pub fn load(&mut self) -> Result<(), StoreError> {
        let content = std::fs::read_to_string(&self.path)?;
        let mut reader = csv::Reader::from_reader(content.as_bytes());

        let mut devices = HashMap::new();
        let mut order = Vec::new();

        for row in reader.deserialize::<DeviceRow>() {
            let row = row?;
            let key = mac_key(&row.mac);
            if key.is_empty() || devices.contains_key(&key) {
                // The ordering sequence holds each MAC exactly once
                continue;
            }

            let preferences = if row.preferences.trim().is_empty() {
                Preferences::new()
            } else {
                serde_json::from_str(&row.preferences).unwrap_or_else(|e| {
                    warn!(mac = %row.mac, error = %e, "Unreadable preferences, falling back to empty set");
                    Preferences::new()
                })
            };

            order.push(key.clone());
            devices.insert(
                key,
                KnownDevice {
                    mac: row.mac,
                    display_name: row.name,
                    preferences,
                    priority: 0,
                },
            );
        }

        self.devices = devices;
        self.order = order;
        self.reindex();

        debug!(count = self.order.len(), path = %self.path.display(), "Loaded known devices");
        Ok(())
    }

    /// Serialize the catalogue back to disk in priority order.
    ///
    /// Iterates the ordering sequence, not catalogue insertion order, and
    /// rewrites the whole file so row order always reflects priority.
    pub fn save(&self) -> Result<(), StoreError> {
        let mut writer = csv::Writer::from_path(&self.path)?;
        for key in &self.order {
            if let Some(device) = self.devices.get(key) {
                writer.serialize(DeviceRow {
                    mac: device.mac.clone(),
                    name: device.display_name.clone(),
                    preferences: serde_json::to_string(&device.preferences)?,
                })?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Admit an observed device into the catalogue at lowest priority.
    ///
    /// Idempotent: an already-known MAC is a no-op that never reorders or
    /// resets the device. Returns the newly created record, or `None` for
    /// a no-op. A save failure is returned but the in-memory admission
    /// stands.
    pub fn admit(&mut self, observed: &ObservedDevice) -> Result<Option<KnownDevice>, StoreError> {
        let key = mac_key(&observed.mac);
        if key.is_empty() {
            return Err(StoreError::InvalidInput(
                "observed device has no MAC address".to_string(),
            ));
        }
        if self.devices.contains_key(&key) {
            return Ok(None);
        }

        let display_name = sanitize_hostname(observed.hostname.as_deref().unwrap_or(""));
        let device = KnownDevice {
            mac: observed.mac.trim().to_string(),
            display_name,
            preferences: default_preferences(),
            priority: self.order.len(),
        };

        debug!(mac = %key, name = %device.display_name, priority = device.priority, "Admitting new device");
        self.order.push(key.clone());
        self.devices.insert(key.clone(), device);
        self.save()?;
        Ok(self.devices.get(&key).cloned())
    }

    /// Update a device's display name.
    pub fn rename(&mut self, mac: &str, name: &str) -> Result<KnownDevice, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput(
                "name must not be empty".to_string(),
            ));
        }
        let key = mac_key(mac);
        let device = self
            .devices
            .get_mut(&key)
            .ok_or(StoreError::NotFound(key.clone()))?;
        device.display_name = name.to_string();
        let updated = device.clone();
        self.save()?;
        Ok(updated)
    }

    /// Move a device to `target` in the ordering sequence.
    ///
    /// The MAC is removed from its current position, `target` is clamped
    /// to the remaining sequence, and every device's priority is
    /// recomputed from its new index. A full reindex, not a swap: devices
    /// between the old and new position shift by one.
    pub fn reprioritize(&mut self, mac: &str, target: usize) -> Result<KnownDevice, StoreError> {
        let key = mac_key(mac);
        if !self.devices.contains_key(&key) {
            return Err(StoreError::NotFound(key));
        }

        self.order.retain(|k| *k != key);
        let index = target.min(self.order.len());
        self.order.insert(index, key.clone());
        self.reindex();

        let updated = self
            .devices
            .get(&key)
            .cloned()
            .ok_or(StoreError::NotFound(key))?;
        self.save()?;
        Ok(updated)
    }

    /// Shallow-merge `partial` into a device's preferences: new keys are
    /// added or overwritten, untouched keys survive.
    pub fn update_preferences(
        &mut self,
        mac: &str,
        partial: Preferences,
    ) -> Result<KnownDevice, StoreError> {
        let key = mac_key(mac);
        let device = self
            .devices
            .get_mut(&key)
            .ok_or(StoreError::NotFound(key.clone()))?;
        for (k, v) in partial {
            device.preferences.insert(k, v);
        }
        let updated = device.clone();
        self.save()?;
        Ok(updated)
    }

    /// Look up a device by MAC (case-insensitive).
    pub fn get(&self, mac: &str) -> Option<&KnownDevice> {
        self.devices.get(&mac_key(mac))
    }

    /// All known devices in priority order.
    pub fn all(&self) -> Vec<KnownDevice> {
        self.order
            .iter()
            .filter_map(|key| self.devices.get(key))
            .cloned()
            .collect()
    }

    /// Position of a MAC in the ordering sequence, if known.
    pub fn position(&self, mac: &str) -> Option<usize> {
        let key = mac_key(mac);
        self.order.iter().position(|k| *k == key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Recompute every device's priority from its index in the ordering
    /// sequence.
    fn reindex(&mut self) {
        for (i, key) in self.order.iter().enumerate() {
            if let Some(device) = self.devices.get_mut(key) {
                device.priority = i;
            }
        }
    }
}
