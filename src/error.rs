// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Maximum number of servers ({limit}) reached for host {host}")]
    HostLimit { host: String, limit: usize },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Server not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegistryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
