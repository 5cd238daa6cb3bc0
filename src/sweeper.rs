// src/sweeper.rs
//! Periodic liveness sweep.
//!
//! The sweep runs inline in the timer loop, so a slow sweep delays the next tick
//! instead of overlapping it. TTL and interval are independent: a server is
//! demoted once it has been silent for longer than the TTL and a tick observes it.

use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use log::{debug, error, info};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use crate::error::StoreError;
use crate::storage::Store;

pub struct Sweeper {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Sweeper {
    pub fn spawn(store: Arc<dyn Store>, ttl: Duration, interval: Duration) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("Liveness sweeper started (ttl {:?}, interval {:?})", ttl, interval);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        match sweep(store.as_ref(), ttl) {
                            Ok(0) => {}
                            Ok(demoted) => info!("Marked {} stale servers inactive", demoted),
                            // retried on the next tick
                            Err(e) => error!("Liveness sweep failed: {}", e),
                        }
                    }
                }
            }
            debug!("Liveness sweeper stopped");
        });
        Self { stop_tx, task }
    }

    /// Signals the task and waits for any in-progress sweep to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        if let Err(e) = self.task.await {
            error!("Liveness sweeper task failed: {}", e);
        }
    }
}

/// Demotes every active record whose last checkin is older than `now - ttl`.
pub fn sweep(store: &dyn Store, ttl: Duration) -> Result<usize, StoreError> {
    let now = Utc::now();
    let cutoff = chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_sub_signed(ttl));
    match cutoff {
        Some(cutoff) => store.mark_inactive(cutoff),
        None => Ok(0),
    }
}
