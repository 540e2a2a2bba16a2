//! Presence Registry: turns observation batches into the served snapshot

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::device::{mac_key, ObservedDevice, PresenceRecord};
use crate::store::KnownDeviceStore;

/// Result of one ingest, reported back to the scanner.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IngestSummary {
    pub count: usize,
}

/// Holds the latest observation batch merged against the Known-Device
/// Store, priority-sorted and annotated for the display client.
///
/// The snapshot is replaced by whole-value swap on every ingest and never
/// mutated field-by-field, so readers either see the previous snapshot or
/// the complete new one.
#[derive(Debug)]
pub struct PresenceRegistry {
    store: KnownDeviceStore,
    snapshot: Vec<PresenceRecord>,
}

impl PresenceRegistry {
    pub fn new(store: KnownDeviceStore) -> Self {
        Self {
            store,
            snapshot: Vec::new(),
        }
    }

    /// Merge an observation batch into a new served snapshot.
    ///
    /// Every unseen MAC is admitted into the store at lowest priority
    /// (admission failures are logged, the merge continues). The batch is
    /// then deduplicated by MAC with the last occurrence winning,
    /// annotated with catalogue metadata, and sorted: known devices by
    /// their position in the ordering sequence, unknown devices after
    /// them in batch order.
    pub fn ingest(&mut self, batch: Vec<ObservedDevice>) -> IngestSummary {
        for observed in &batch {
            if let Err(e) = self.store.admit(observed) {
                warn!(mac = %observed.mac, error = %e, "Failed to admit observed device");
            }
        }

        // Last occurrence wins; the entry keeps its first position, so
        // unknown devices later retain their batch order.
        let mut merged: IndexMap<String, ObservedDevice> = IndexMap::new();
        for observed in batch {
            merged.insert(mac_key(&observed.mac), observed);
        }

        let mut records: Vec<PresenceRecord> = merged
            .into_iter()
            .map(|(key, observed)| {
                let known = self.store.get(&key);
                PresenceRecord::annotate(observed, known)
            })
            .collect();

        // Stable sort: known devices ascend by priority, unknown devices
        // sort after every known one without reordering among themselves.
        records.sort_by_key(|r| r.priority.unwrap_or(usize::MAX));

        let count = records.len();
        self.snapshot = records;

        debug!(count, known = self.store.len(), "Snapshot replaced");
        IngestSummary { count }
    }

    /// The last computed snapshot; empty before the first ingest.
    pub fn current(&self) -> &[PresenceRecord] {
        &self.snapshot
    }

    pub fn store(&self) -> &KnownDeviceStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut KnownDeviceStore {
        &mut self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn observed(mac: &str, ip: &str) -> ObservedDevice {
        ObservedDevice {
            mac: mac.to_string(),
            ip: Some(ip.to_string()),
            hostname: None,
            last_seen: None,
        }
    }

    fn registry_in(dir: &TempDir) -> PresenceRegistry {
        PresenceRegistry::new(KnownDeviceStore::new(dir.path().join("known_devices.csv")))
    }

    #[test]
    fn test_empty_before_first_ingest() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);
        assert!(registry.current().is_empty());
    }

    #[test]
    fn test_ingest_sorts_by_priority() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);

        // A at priority 0, B at priority 1
        registry
            .store_mut()
            .admit(&observed("aa:aa:aa:aa:aa:aa", "1.1.1.1"))
            .unwrap();
        registry
            .store_mut()
            .admit(&observed("bb:bb:bb:bb:bb:bb", "1.1.1.2"))
            .unwrap();

        // X unseen, arrives first in the batch
        let summary = registry.ingest(vec![
            observed("cc:cc:cc:cc:cc:cc", "1.1.1.3"),
            observed("bb:bb:bb:bb:bb:bb", "1.1.1.2"),
            observed("aa:aa:aa:aa:aa:aa", "1.1.1.1"),
        ]);

        assert_eq!(summary.count, 3);
        let macs: Vec<&str> = registry.current().iter().map(|r| r.mac.as_str()).collect();
        assert_eq!(
            macs,
            vec!["aa:aa:aa:aa:aa:aa", "bb:bb:bb:bb:bb:bb", "cc:cc:cc:cc:cc:cc"]
        );
    }

    #[test]
    fn test_new_macs_join_at_lowest_priority() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);

        registry.ingest(vec![observed("aa:aa:aa:aa:aa:aa", "1.1.1.1")]);
        registry.ingest(vec![
            observed("aa:aa:aa:aa:aa:aa", "1.1.1.1"),
            observed("bb:bb:bb:bb:bb:bb", "1.1.1.2"),
        ]);

        assert_eq!(registry.store().position("aa:aa:aa:aa:aa:aa"), Some(0));
        assert_eq!(registry.store().position("bb:bb:bb:bb:bb:bb"), Some(1));

        let record = &registry.current()[1];
        assert_eq!(record.mac, "bb:bb:bb:bb:bb:bb");
        assert!(record.is_known);
        assert_eq!(record.priority, Some(1));
    }

    #[test]
    fn test_dedup_last_occurrence_wins() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);

        let summary = registry.ingest(vec![
            observed("aa:aa:aa:aa:aa:aa", "1.1.1.1"),
            observed("aa:aa:aa:aa:aa:aa", "2.2.2.2"),
        ]);

        assert_eq!(summary.count, 1);
        let snapshot = registry.current();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].ip.as_deref(), Some("2.2.2.2"));
    }

    #[test]
    fn test_dedup_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);

        let summary = registry.ingest(vec![
            observed("AA:AA:AA:AA:AA:AA", "1.1.1.1"),
            observed("aa:aa:aa:aa:aa:aa", "2.2.2.2"),
        ]);

        assert_eq!(summary.count, 1);
        assert_eq!(registry.store().len(), 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);

        let batch = vec![
            observed("bb:bb:bb:bb:bb:bb", "1.1.1.2"),
            observed("aa:aa:aa:aa:aa:aa", "1.1.1.1"),
        ];

        registry.ingest(batch.clone());
        let first: Vec<PresenceRecord> = registry.current().to_vec();

        registry.ingest(batch);
        assert_eq!(registry.current(), first.as_slice());
    }

    #[test]
    fn test_ingest_annotates_known_fields() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);

        registry
            .store_mut()
            .admit(&ObservedDevice {
                mac: "aa:aa:aa:aa:aa:aa".to_string(),
                ip: None,
                hostname: Some("My Phone!!".to_string()),
                last_seen: None,
            })
            .unwrap();
        registry
            .store_mut()
            .rename("aa:aa:aa:aa:aa:aa", "Stef's Phone")
            .unwrap();

        registry.ingest(vec![observed("aa:aa:aa:aa:aa:aa", "1.1.1.1")]);

        let record = &registry.current()[0];
        assert!(record.is_known);
        assert_eq!(record.display_name.as_deref(), Some("Stef's Phone"));
        assert!(record.preferences.is_some());
        assert_eq!(record.priority, Some(0));
        // Scanner-supplied fields pass through
        assert_eq!(record.ip.as_deref(), Some("1.1.1.1"));
    }

    #[test]
    fn test_snapshot_replaced_wholesale() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);

        registry.ingest(vec![
            observed("aa:aa:aa:aa:aa:aa", "1.1.1.1"),
            observed("bb:bb:bb:bb:bb:bb", "1.1.1.2"),
        ]);
        assert_eq!(registry.current().len(), 2);

        // A device absent from the next batch disappears from the snapshot
        registry.ingest(vec![observed("aa:aa:aa:aa:aa:aa", "1.1.1.1")]);
        assert_eq!(registry.current().len(), 1);
        assert_eq!(registry.current()[0].mac, "aa:aa:aa:aa:aa:aa");
        // ...but stays in the catalogue
        assert_eq!(registry.store().len(), 2);
    }
}
