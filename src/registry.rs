// src/registry.rs
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use crate::config::Config;
use crate::error::{RegistryError, StoreError};
use crate::models::query::{Query, ServerFilter};
use crate::models::registration::RegistrationPayload;
use crate::models::server::{ServerRecord, Upserted};
use crate::storage::memory::ServerStorage;
use crate::storage::{snapshot, Store};
use crate::sweeper::Sweeper;

/// Owns the server store and the liveness sweeper; shared with every request handler.
pub struct Registry {
    store: Arc<dyn Store>,
    snapshot_path: Option<PathBuf>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl Registry {
    pub fn new(store: Arc<dyn Store>, snapshot_path: Option<PathBuf>) -> Self {
        Self {
            store,
            snapshot_path,
            sweeper: Mutex::new(None),
        }
    }

    /// Builds the in-memory store, restoring the snapshot when one is configured.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let storage = ServerStorage::new(config.max_servers_per_ip);
        if let Some(path) = &config.snapshot_path {
            storage.restore(snapshot::load(path)?);
            info!("Restored {} servers", storage.len());
        }
        Ok(Self::new(Arc::new(storage), config.snapshot_path.clone()))
    }

    pub fn register(&self, payload: RegistrationPayload, peer: IpAddr) -> Result<Upserted, RegistryError> {
        let record = payload.into_record(peer, Utc::now())?;
        let upserted = self.store.upsert(record)?;
        debug!(
            "{} server {}",
            if upserted.is_created() { "Registered" } else { "Updated" },
            upserted.record().address
        );
        Ok(upserted)
    }

    pub fn checkin(&self, address: &str) -> Result<ServerRecord, RegistryError> {
        let server = self
            .store
            .checkin(address, Utc::now())?
            .ok_or_else(|| RegistryError::NotFound(address.to_string()))?;
        debug!("Checkin from {}", address);
        Ok(server)
    }

    pub fn get(&self, address: &str) -> Result<ServerRecord, RegistryError> {
        self.store
            .get(address)
            .ok_or_else(|| RegistryError::NotFound(address.to_string()))
    }

    /// Lists matching servers; an empty result is `NotFound`.
    pub fn list(&self, filter: ServerFilter) -> Result<Vec<ServerRecord>, RegistryError> {
        let servers = self.store.list(&Query::list(filter));
        if servers.is_empty() {
            return Err(RegistryError::NotFound("no server matches the filter".to_string()));
        }
        Ok(servers)
    }

    /// The active matching server with the most recent checkin.
    pub fn latest(&self, filter: ServerFilter) -> Result<ServerRecord, RegistryError> {
        self.store
            .list(&Query::latest(filter))
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::NotFound("no active server matches the filter".to_string()))
    }

    pub fn remove(&self, address: &str) -> Result<ServerRecord, RegistryError> {
        let server = self
            .store
            .remove(address)?
            .ok_or_else(|| RegistryError::NotFound(address.to_string()))?;
        debug!("Removed server {}", address);
        Ok(server)
    }

    /// Starts the liveness sweeper. No-op while one is already running.
    pub fn start_sweeper(&self, ttl: Duration, interval: Duration) {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            warn!("Liveness sweeper already running");
            return;
        }
        *sweeper = Some(Sweeper::spawn(self.store.clone(), ttl, interval));
    }

    /// Stops the sweeper and waits for it, then flushes the snapshot if configured.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }
        if let Some(path) = &self.snapshot_path {
            snapshot::save(path, &self.store.records())?;
        }
        info!("Registry shut down");
        Ok(())
    }
}
