// src/models/query.rs
use std::cmp::Ordering;
use serde::Deserialize;
use crate::models::server::ServerRecord;

/// Discovery criteria from the query string. An absent criterion does not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerFilter {
    pub game_id: Option<i64>,
    pub game_mode: Option<String>,
    pub map: Option<String>,
    pub max_players: Option<i64>,
    pub active: Option<bool>,
    pub slots: Option<i64>,
    pub limit: Option<i64>,
}

impl ServerFilter {
    pub fn matches(&self, server: &ServerRecord) -> bool {
        self.game_id.map_or(true, |id| server.game_id == id)
            && self.game_mode.as_ref().map_or(true, |mode| server.game_mode == *mode)
            && self.map.as_ref().map_or(true, |map| server.map == *map)
            && self.max_players.map_or(true, |max| i64::from(server.max_players) <= max)
            && self.active.map_or(true, |active| server.active == active)
            && self.slots.map_or(true, |slots| server.free_slots() >= slots)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending by address.
    Address,
    /// Most recent checkin first, ties broken by address.
    LatestCheckin,
}

impl SortOrder {
    fn compare(self, a: &ServerRecord, b: &ServerRecord) -> Ordering {
        match self {
            Self::Address => a.address.cmp(&b.address),
            Self::LatestCheckin => b
                .last_checkin
                .cmp(&a.last_checkin)
                .then_with(|| a.address.cmp(&b.address)),
        }
    }
}

/// A compiled discovery query: predicate, deterministic ordering and optional cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub filter: ServerFilter,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl Query {
    pub fn list(filter: ServerFilter) -> Self {
        // non-positive limits are ignored
        let limit = filter
            .limit
            .filter(|l| *l > 0)
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX));
        Self { filter, order: SortOrder::Address, limit }
    }

    pub fn latest(mut filter: ServerFilter) -> Self {
        filter.active = Some(true);
        Self { filter, order: SortOrder::LatestCheckin, limit: Some(1) }
    }

    pub fn matches(&self, server: &ServerRecord) -> bool {
        self.filter.matches(server)
    }

    /// Orders and truncates already-filtered records.
    pub fn finish(&self, mut servers: Vec<ServerRecord>) -> Vec<ServerRecord> {
        servers.sort_by(|a, b| self.order.compare(a, b));
        if let Some(limit) = self.limit {
            servers.truncate(limit);
        }
        servers
    }

    pub fn execute<I>(&self, servers: I) -> Vec<ServerRecord>
    where
        I: IntoIterator<Item = ServerRecord>,
    {
        let matching = servers.into_iter().filter(|s| self.matches(s)).collect();
        self.finish(matching)
    }
}
