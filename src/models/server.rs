// src/models/server.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One announced game server, keyed by its `ip:port` address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub address: String,
    pub name: String,
    pub game_id: i64,
    pub ip: String,
    pub port: u16,
    pub game_mode: String,
    pub map: String,
    pub current_players: u32,
    pub max_players: u32,
    pub registered_at: DateTime<Utc>,
    pub last_checkin: DateTime<Utc>,
    pub active: bool,
}

impl ServerRecord {
    pub fn free_slots(&self) -> i64 {
        i64::from(self.max_players) - i64::from(self.current_players)
    }

    /// Host half of the address, used for the per-host registration limit.
    pub fn host(&self) -> &str {
        &self.ip
    }

    /// Overwrites every mutable field with `incoming`, keeping identity and first registration time.
    /// `last_checkin` never moves backwards.
    pub fn overwrite_with(&mut self, incoming: ServerRecord) {
        let last_checkin = self.last_checkin.max(incoming.last_checkin);
        let registered_at = self.registered_at;
        *self = incoming;
        self.registered_at = registered_at;
        self.last_checkin = last_checkin;
        self.active = true;
    }

    pub fn refresh(&mut self, now: DateTime<Utc>) {
        self.last_checkin = self.last_checkin.max(now);
        self.active = true;
    }
}

pub fn format_address(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}

/// Outcome of an upsert, distinguishing a first registration from a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upserted {
    Created(ServerRecord),
    Updated(ServerRecord),
}

impl Upserted {
    pub fn record(&self) -> &ServerRecord {
        match self {
            Self::Created(r) | Self::Updated(r) => r,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}
