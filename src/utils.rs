// src/utils.rs
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use actix_web::http::StatusCode;
use governor::{RateLimiter, clock::DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use ipnetwork::IpNetwork;
use std::net::IpAddr;
use log::{debug, error, warn};
use std::fmt;
use crate::config::Config;
use crate::error::{RegistryError, StoreError};

pub type IpRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// Per-client limiters, one per endpoint family.
pub struct RateLimiters {
    pub register: IpRateLimiter,
    pub list: IpRateLimiter,
    pub delete: IpRateLimiter,
}

impl RateLimiters {
    pub fn from_config(config: &Config) -> Self {
        Self {
            register: RateLimiter::keyed(config.register_quota()),
            list: RateLimiter::keyed(config.server_list_quota()),
            delete: RateLimiter::keyed(config.server_delete_quota()),
        }
    }
}

pub fn check_rate(limiter: &IpRateLimiter, ip: IpAddr, what: &str) -> Result<(), RequestError> {
    if limiter.check_key(&ip).is_err() {
        warn!("Rate limit exceeded for {} for ip: {}", what, ip);
        return Err(RequestError::RateLimitExceeded);
    }
    Ok(())
}

#[derive(Debug)]
pub enum RequestError {
    MissingPeerIP,
    InvalidForwardedHeader,
    RateLimitExceeded,
    IPv6NotSupported,
    Registry(RegistryError),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPeerIP => write!(f, "Failed to extract client IP"),
            Self::InvalidForwardedHeader => write!(f, "Invalid X-Forwarded-For header"),
            Self::RateLimitExceeded => write!(f, "Rate limit exceeded"),
            Self::IPv6NotSupported => write!(f, "IPv6 addresses are not supported"),
            Self::Registry(e) => write!(f, "{}", e),
        }
    }
}

impl From<RegistryError> for RequestError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

impl ResponseError for RequestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::Registry(RegistryError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Registry(RegistryError::Validation(_))
            | Self::Registry(RegistryError::Store(StoreError::HostLimit { .. })) => StatusCode::BAD_REQUEST,
            Self::Registry(RegistryError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            error!("Request failed: {}", self);
        }
        HttpResponse::build(self.status_code()).body(self.to_string())
    }
}

/// Client address of the request. The first `X-Forwarded-For` entry is only
/// honoured when the connection comes from a trusted proxy network.
pub fn extract_real_ip(req: &HttpRequest, trusted_proxies: &[IpNetwork]) -> Result<IpAddr, RequestError> {
    let peer_addr = match req.peer_addr() {
        Some(addr) => addr.ip(),
        None => return Err(RequestError::MissingPeerIP),
    };

    let mut ip = peer_addr;
    if trusted_proxies.iter().any(|network| network.contains(peer_addr)) {
        if let Some(forwarded_for) = req.headers().get("X-Forwarded-For") {
            ip = forwarded_for
                .to_str()
                .ok()
                .and_then(|value| value.split(',').next())
                .and_then(|first| first.trim().parse::<IpAddr>().ok())
                .ok_or(RequestError::InvalidForwardedHeader)?;
            debug!("Using X-Forwarded-For {} from proxy {}", ip, peer_addr);
        }
    }

    match ip {
        IpAddr::V4(_) => Ok(ip),
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .ok_or(RequestError::IPv6NotSupported),
    }
}
