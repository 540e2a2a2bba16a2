//! Application state management

use anyhow::Result;
use foyer_core::{KnownDeviceStore, PresenceRegistry};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::Config;
use crate::weather::WeatherService;

/// Shared application state
pub struct AppState {
    /// Presence registry and known-device store, behind a single lock so
    /// every mutation (ingest, rename, reprioritize, preference update)
    /// runs as one critical section and readers never observe a
    /// half-reordered catalogue.
    pub registry: RwLock<PresenceRegistry>,
    /// Weather proxy with its own cache
    pub weather: WeatherService,
    /// Configuration
    pub config: Config,
}

impl AppState {
    /// Create new application state, loading the known-device table from
    /// disk. A missing or unreadable table is reported and the daemon
    /// starts with an empty catalogue.
    pub fn new(config: Config) -> Result<Arc<Self>> {
        let store = load_or_create_store(&config.storage.path);
        let registry = PresenceRegistry::new(store);
        let weather = WeatherService::new(&config.weather)?;

        Ok(Arc::new(Self {
            registry: RwLock::new(registry),
            weather,
            config,
        }))
    }
}

/// Load the known-device store or start empty
fn load_or_create_store(path: &str) -> KnownDeviceStore {
    let mut store = KnownDeviceStore::new(path);
    if store.path().exists() {
        match store.load() {
            Ok(()) => {
                info!(path = %path, count = store.len(), "Loaded known devices");
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to load known devices, starting empty");
            }
        }
    } else {
        info!(path = %path, "Known-device table not found, starting empty");
    }
    store
}
