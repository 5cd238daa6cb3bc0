use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use std::num::NonZeroU32;
use governor::Quota;
use ipnetwork::IpNetwork;
use log::warn;

/// The TTL must cover at least this many sweep intervals so a server that
/// heartbeats once per interval is never demoted between heartbeats.
pub const MIN_TTL_INTERVALS: u64 = 2;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,

    // Rate limiting configs
    pub register_period_secs: u64,
    pub register_burst_limit: u32,
    pub server_list_period_secs: u64,
    pub server_list_burst_limit: u32,
    pub server_delete_period_secs: u64,
    pub server_delete_burst_limit: u32,

    // Server limits
    pub max_servers_per_ip: usize,

    // Liveness
    pub server_timeout_secs: u64,
    pub sweep_interval_secs: u64,

    pub snapshot_path: Option<PathBuf>,
    pub trusted_proxies: Vec<IpNetwork>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            register_period_secs: 1,
            register_burst_limit: 30,
            server_list_period_secs: 1,
            server_list_burst_limit: 120,
            server_delete_period_secs: 5,
            server_delete_burst_limit: 10,
            max_servers_per_ip: 8,
            server_timeout_secs: 30,
            sweep_interval_secs: 5,
            snapshot_path: None,
            trusted_proxies: Vec::new(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_networks(value: &str) -> Vec<IpNetwork> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match IpNetwork::from_str(s) {
            Ok(network) => Some(network),
            Err(e) => {
                warn!("Ignoring invalid trusted proxy network {}: {}", s, e);
                None
            }
        })
        .collect()
}

fn quota(period_secs: u64, burst: u32) -> Quota {
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
    Quota::with_period(Duration::from_secs(period_secs.max(1)))
        .map(|q| q.allow_burst(burst))
        .unwrap_or_else(|| Quota::per_second(burst))
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port: env_or("PORT", defaults.port),
            register_period_secs: env_or("REGISTER_PERIOD_SECS", defaults.register_period_secs),
            register_burst_limit: env_or("REGISTER_BURST_LIMIT", defaults.register_burst_limit),
            server_list_period_secs: env_or("SERVER_LIST_PERIOD_SECS", defaults.server_list_period_secs),
            server_list_burst_limit: env_or("SERVER_LIST_BURST_LIMIT", defaults.server_list_burst_limit),
            server_delete_period_secs: env_or("SERVER_DELETE_PERIOD_SECS", defaults.server_delete_period_secs),
            server_delete_burst_limit: env_or("SERVER_DELETE_BURST_LIMIT", defaults.server_delete_burst_limit),
            max_servers_per_ip: env_or("MAX_SERVERS_PER_IP", defaults.max_servers_per_ip),
            server_timeout_secs: env_or("SERVER_TIMEOUT_SECS", defaults.server_timeout_secs),
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs),
            snapshot_path: env::var("SNAPSHOT_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            trusted_proxies: env::var("TRUSTED_PROXIES")
                .map(|v| parse_networks(&v))
                .unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sweep_interval_secs == 0 {
            return Err("SWEEP_INTERVAL_SECS must be at least 1".to_string());
        }
        if self.server_timeout_secs < MIN_TTL_INTERVALS * self.sweep_interval_secs {
            return Err(format!(
                "SERVER_TIMEOUT_SECS ({}) must be at least {} x SWEEP_INTERVAL_SECS ({})",
                self.server_timeout_secs, MIN_TTL_INTERVALS, self.sweep_interval_secs
            ));
        }
        Ok(())
    }

    pub fn bind(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.server_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn register_quota(&self) -> Quota {
        quota(self.register_period_secs, self.register_burst_limit)
    }

    pub fn server_list_quota(&self) -> Quota {
        quota(self.server_list_period_secs, self.server_list_burst_limit)
    }

    pub fn server_delete_quota(&self) -> Quota {
        quota(self.server_delete_period_secs, self.server_delete_burst_limit)
    }
}
