// src/storage/mod.rs
pub mod memory;
pub mod snapshot;

use chrono::{DateTime, Utc};
use crate::error::StoreError;
use crate::models::query::Query;
use crate::models::server::{ServerRecord, Upserted};

/// Keyed server record store. Single-key writes are linearizable per address and
/// `mark_inactive` is observed by readers as one batch.
pub trait Store: Send + Sync {
    fn upsert(&self, record: ServerRecord) -> Result<Upserted, StoreError>;

    fn get(&self, address: &str) -> Option<ServerRecord>;

    fn list(&self, query: &Query) -> Vec<ServerRecord>;

    /// Refreshes liveness of a known address, `None` when unknown.
    fn checkin(&self, address: &str, now: DateTime<Utc>) -> Result<Option<ServerRecord>, StoreError>;

    /// Deactivates every active record whose last checkin is older than `cutoff`.
    fn mark_inactive(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;

    fn remove(&self, address: &str) -> Result<Option<ServerRecord>, StoreError>;

    fn records(&self) -> Vec<ServerRecord>;
}
