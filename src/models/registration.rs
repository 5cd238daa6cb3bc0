// src/models/registration.rs
use std::net::{IpAddr, Ipv4Addr};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use crate::error::RegistryError;
use crate::models::server::{format_address, ServerRecord};

const MAX_NAME_LEN: usize = 64;
const MAX_LABEL_LEN: usize = 32;

/// Announce body posted by a dedicated server. Every field is optional on the
/// wire so missing values surface as validation errors rather than decode errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationPayload {
    pub name: Option<String>,
    pub game_id: Option<i64>,
    pub ip: Option<String>,
    pub port: Option<i64>,
    pub game_mode: Option<String>,
    pub map: Option<String>,
    pub current_players: Option<i64>,
    pub max_players: Option<i64>,
}

impl RegistrationPayload {
    /// Validates the payload and converts it into a fresh record. The host is the
    /// payload's `ip` when given, otherwise the caller's observed address.
    pub fn into_record(self, peer: IpAddr, now: DateTime<Utc>) -> Result<ServerRecord, RegistryError> {
        let ip = match self.ip.as_deref().map(str::trim) {
            Some(ip) => ip
                .parse::<Ipv4Addr>()
                .map_err(|_| RegistryError::validation(format!("ip '{}' is not an IPv4 address", ip)))?,
            None => match peer {
                IpAddr::V4(v4) => v4,
                IpAddr::V6(_) => return Err(RegistryError::validation("IPv6 addresses are not supported")),
            },
        };

        let port = self.port.ok_or_else(|| RegistryError::validation("port is required"))?;
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| RegistryError::validation(format!("port {} is out of range", port)))?;

        let name = required_text("name", self.name, MAX_NAME_LEN)?;
        let game_mode = required_text("game_mode", self.game_mode, MAX_LABEL_LEN)?;
        let map = required_text("map", self.map, MAX_LABEL_LEN)?;
        let game_id = self.game_id.ok_or_else(|| RegistryError::validation("game_id is required"))?;

        let max_players = self
            .max_players
            .ok_or_else(|| RegistryError::validation("max_players is required"))?;
        let current_players = self.current_players.unwrap_or(0);
        if current_players < 0 || current_players > max_players {
            return Err(RegistryError::validation(format!(
                "current_players must be between 0 and max_players ({}), got {}",
                max_players, current_players
            )));
        }
        let max_players = u32::try_from(max_players)
            .map_err(|_| RegistryError::validation(format!("max_players {} is out of range", max_players)))?;
        // bounded by max_players above
        let current_players = current_players as u32;

        let ip = ip.to_string();
        Ok(ServerRecord {
            address: format_address(&ip, port),
            name,
            game_id,
            ip,
            port,
            game_mode,
            map,
            current_players,
            max_players,
            registered_at: now,
            last_checkin: now,
            active: true,
        })
    }
}

fn required_text(field: &str, value: Option<String>, max_len: usize) -> Result<String, RegistryError> {
    let value = value.unwrap_or_default().trim().to_string();
    if value.is_empty() {
        return Err(RegistryError::validation(format!("{} must be at least 1 char", field)));
    }
    if value.chars().count() > max_len {
        return Err(RegistryError::validation(format!("{} is too long (max {} chars)", field, max_len)));
    }
    Ok(value)
}
