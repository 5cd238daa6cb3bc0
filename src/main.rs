// src/main.rs
mod config;
mod error;
mod handlers;
mod models;
mod registry;
mod storage;
mod sweeper;
mod utils;

use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::{error, info};
use crate::config::Config;
use crate::registry::Registry;
use crate::utils::RateLimiters;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
    }

    let registry = match Registry::from_config(&config) {
        Ok(registry) => web::Data::new(registry),
        Err(e) => {
            error!("Failed to initialize server registry: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e));
        }
    };
    registry.start_sweeper(config.ttl(), config.sweep_interval());

    let limiters = web::Data::new(RateLimiters::from_config(&config));
    let bind = config.bind();
    let shared_config = web::Data::new(config);

    info!("Starting server on {}", bind);
    let app_registry = registry.clone();
    let served = HttpServer::new(move || {
        App::new()
            .app_data(app_registry.clone())
            .app_data(limiters.clone())
            .app_data(shared_config.clone())
            .configure(handlers::configure)
    })
        .bind(&bind)?
        .run().await;

    // in-flight requests have drained by the time run() resolves
    if let Err(e) = registry.shutdown().await {
        error!("Failed to flush server registry: {}", e);
    }
    served
}
