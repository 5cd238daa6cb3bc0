// src/handlers/mod.rs
pub mod servers;

use actix_web::web;

/// Registers the discovery API. `/servers/latest` must precede `/servers/{address}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/servers", web::get().to(servers::list_servers))
        .route("/servers", web::post().to(servers::register_server))
        .route("/servers/latest", web::get().to(servers::latest_server))
        .route("/servers/{address}", web::get().to(servers::get_server))
        .route("/servers/{address}", web::put().to(servers::checkin_server))
        .route("/servers/{address}", web::delete().to(servers::delete_server));
}
