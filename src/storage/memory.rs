// src/storage/memory.rs
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use crate::error::StoreError;
use crate::models::query::Query;
use crate::models::server::{ServerRecord, Upserted};
use super::Store;

pub struct ServerStorage {
    servers: DashMap<String, ServerRecord>,
    // registered addresses per host; its entry lock also orders writes for that host
    hosts: DashMap<String, usize>,
    // shared by single-key writes and listings, exclusive for batch updates
    batch: RwLock<()>,
    max_servers_per_ip: usize,
}

impl ServerStorage {
    pub fn new(max_servers_per_ip: usize) -> Self {
        Self {
            servers: DashMap::new(),
            hosts: DashMap::new(),
            batch: RwLock::new(()),
            max_servers_per_ip,
        }
    }

    /// Loads previously persisted records as-is, bypassing the per-host limit.
    pub fn restore(&self, records: Vec<ServerRecord>) {
        let _batch = self.batch.write();
        for record in records {
            let address = record.address.clone();
            let host = record.host().to_string();
            if self.servers.insert(address, record).is_none() {
                *self.hosts.entry(host).or_insert(0) += 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }
}

impl Store for ServerStorage {
    fn upsert(&self, record: ServerRecord) -> Result<Upserted, StoreError> {
        let _batch = self.batch.read();
        // lock order: host entry, then server entry
        let mut host_count = self.hosts.entry(record.host().to_string()).or_insert(0);

        match self.servers.entry(record.address.clone()) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().overwrite_with(record);
                Ok(Upserted::Updated(existing.get().clone()))
            }
            Entry::Vacant(slot) => {
                if self.max_servers_per_ip > 0 && *host_count >= self.max_servers_per_ip {
                    return Err(StoreError::HostLimit {
                        host: record.host().to_string(),
                        limit: self.max_servers_per_ip,
                    });
                }
                *host_count += 1;
                let stored = slot.insert(record);
                Ok(Upserted::Created(stored.value().clone()))
            }
        }
    }

    fn get(&self, address: &str) -> Option<ServerRecord> {
        self.servers.get(address).map(|r| r.value().clone())
    }

    fn list(&self, query: &Query) -> Vec<ServerRecord> {
        let matching = {
            let _batch = self.batch.read();
            self.servers
                .iter()
                .filter(|r| query.matches(r.value()))
                .map(|r| r.value().clone())
                .collect()
        };
        query.finish(matching)
    }

    fn checkin(&self, address: &str, now: DateTime<Utc>) -> Result<Option<ServerRecord>, StoreError> {
        let _batch = self.batch.read();
        Ok(self.servers.get_mut(address).map(|mut server| {
            server.refresh(now);
            server.value().clone()
        }))
    }

    fn mark_inactive(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let _batch = self.batch.write();
        let mut demoted = 0;
        for mut server in self.servers.iter_mut() {
            if server.active && server.last_checkin < cutoff {
                server.active = false;
                demoted += 1;
            }
        }
        Ok(demoted)
    }

    fn remove(&self, address: &str) -> Result<Option<ServerRecord>, StoreError> {
        let host = match self.servers.get(address) {
            Some(server) => server.host().to_string(),
            None => return Ok(None),
        };

        let _batch = self.batch.read();
        let Entry::Occupied(mut host_count) = self.hosts.entry(host) else {
            return Ok(None);
        };
        let removed = self.servers.remove(address).map(|(_, server)| server);
        if removed.is_some() {
            *host_count.get_mut() -= 1;
            if *host_count.get() == 0 {
                host_count.remove();
            }
        }
        Ok(removed)
    }

    fn records(&self) -> Vec<ServerRecord> {
        let _batch = self.batch.read();
        self.servers.iter().map(|r| r.value().clone()).collect()
    }
}
