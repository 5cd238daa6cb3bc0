// src/handlers/servers.rs
use actix_web::{web, HttpRequest, HttpResponse};
use crate::config::Config;
use crate::models::query::ServerFilter;
use crate::models::registration::RegistrationPayload;
use crate::models::server::Upserted;
use crate::registry::Registry;
use crate::utils::{check_rate, extract_real_ip, RateLimiters, RequestError};

pub async fn list_servers(
    registry: web::Data<Registry>,
    limiters: web::Data<RateLimiters>,
    config: web::Data<Config>,
    filter: web::Query<ServerFilter>,
    req: HttpRequest,
) -> Result<HttpResponse, RequestError> {
    let peer_ip = extract_real_ip(&req, &config.trusted_proxies)?;
    check_rate(&limiters.list, peer_ip, "server list")?;

    let servers = registry.list(filter.into_inner())?;
    Ok(HttpResponse::Ok().json(servers))
}

pub async fn latest_server(
    registry: web::Data<Registry>,
    limiters: web::Data<RateLimiters>,
    config: web::Data<Config>,
    filter: web::Query<ServerFilter>,
    req: HttpRequest,
) -> Result<HttpResponse, RequestError> {
    let peer_ip = extract_real_ip(&req, &config.trusted_proxies)?;
    check_rate(&limiters.list, peer_ip, "latest server")?;

    let server = registry.latest(filter.into_inner())?;
    Ok(HttpResponse::Ok().json(server))
}

pub async fn get_server(
    registry: web::Data<Registry>,
    limiters: web::Data<RateLimiters>,
    config: web::Data<Config>,
    address: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, RequestError> {
    let peer_ip = extract_real_ip(&req, &config.trusted_proxies)?;
    check_rate(&limiters.list, peer_ip, "server lookup")?;

    let server = registry.get(&address)?;
    Ok(HttpResponse::Ok().json(server))
}

pub async fn register_server(
    registry: web::Data<Registry>,
    limiters: web::Data<RateLimiters>,
    config: web::Data<Config>,
    payload: web::Json<RegistrationPayload>,
    req: HttpRequest,
) -> Result<HttpResponse, RequestError> {
    let peer_ip = extract_real_ip(&req, &config.trusted_proxies)?;
    check_rate(&limiters.register, peer_ip, "registration")?;

    Ok(match registry.register(payload.into_inner(), peer_ip)? {
        Upserted::Created(server) => HttpResponse::Created().json(server),
        Upserted::Updated(server) => HttpResponse::Ok().json(server),
    })
}

pub async fn checkin_server(
    registry: web::Data<Registry>,
    limiters: web::Data<RateLimiters>,
    config: web::Data<Config>,
    address: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, RequestError> {
    let peer_ip = extract_real_ip(&req, &config.trusted_proxies)?;
    check_rate(&limiters.register, peer_ip, "checkin")?;

    let server = registry.checkin(&address)?;
    Ok(HttpResponse::Ok().json(server))
}

pub async fn delete_server(
    registry: web::Data<Registry>,
    limiters: web::Data<RateLimiters>,
    config: web::Data<Config>,
    address: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, RequestError> {
    let peer_ip = extract_real_ip(&req, &config.trusted_proxies)?;
    check_rate(&limiters.delete, peer_ip, "server delete")?;

    let server = registry.remove(&address)?;
    Ok(HttpResponse::Ok().json(server))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use actix_web::{test, App};
    use actix_web::http::StatusCode;
    use serde_json::{json, Value};
    use crate::handlers::configure;
    use crate::models::server::ServerRecord;
    use crate::storage::memory::ServerStorage;
    use crate::storage::Store;
    use crate::sweeper::sweep;

    fn peer() -> SocketAddr {
        "1.2.3.4:40000".parse().unwrap()
    }

    fn announce(port: u16, current: u32) -> Value {
        json!({
            "name": "Friday FFA",
            "game_id": 1,
            "port": port,
            "game_mode": "ffa",
            "map": "m1",
            "current_players": current,
            "max_players": 10,
        })
    }

    macro_rules! app {
        ($storage:expr) => {
            app!($storage, Config::default())
        };
        ($storage:expr, $config:expr) => {{
            let config: Config = $config;
            test::init_service(
                App::new()
                    .app_data(web::Data::new(Registry::new($storage, None)))
                    .app_data(web::Data::new(RateLimiters::from_config(&config)))
                    .app_data(web::Data::new(config))
                    .configure(configure),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn register_then_reregister() {
        let app = app!(Arc::new(ServerStorage::new(0)));

        let req = test::TestRequest::post().uri("/servers").peer_addr(peer()).set_json(announce(7777, 0)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let first: ServerRecord = test::read_body_json(resp).await;
        assert_eq!(first.address, "1.2.3.4:7777");
        assert!(first.active);

        let req = test::TestRequest::post().uri("/servers").peer_addr(peer()).set_json(announce(7777, 5)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let second: ServerRecord = test::read_body_json(resp).await;
        assert_eq!(second.current_players, 5);
        assert!(second.last_checkin >= first.last_checkin);
    }

    #[actix_web::test]
    async fn invalid_registration_is_bad_request() {
        let app = app!(Arc::new(ServerStorage::new(0)));

        let req = test::TestRequest::post().uri("/servers").peer_addr(peer()).set_json(announce(7777, 11)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let mut body = announce(7777, 0);
        body.as_object_mut().unwrap().remove("port");
        let req = test::TestRequest::post().uri("/servers").peer_addr(peer()).set_json(body).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn silent_server_drops_out_of_latest() {
        let storage = Arc::new(ServerStorage::new(0));
        let app = app!(storage.clone());

        let req = test::TestRequest::post().uri("/servers").peer_addr(peer()).set_json(announce(7777, 0)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::get().uri("/servers/latest").peer_addr(peer()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sweep(storage.as_ref(), Duration::from_millis(10)).unwrap(), 1);

        let req = test::TestRequest::get().uri("/servers/latest").peer_addr(peer()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        // the record is kept, only demoted
        let req = test::TestRequest::get().uri("/servers?active=false").peer_addr(peer()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let servers: Vec<ServerRecord> = test::read_body_json(resp).await;
        assert_eq!(servers.len(), 1);
    }

    #[actix_web::test]
    async fn slots_filter_over_http() {
        let app = app!(Arc::new(ServerStorage::new(0)));
        for (port, current) in [(7777, 5), (7778, 8)] {
            let req = test::TestRequest::post()
                .uri("/servers")
                .peer_addr(peer())
                .set_json(announce(port, current))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get().uri("/servers?game_id=1&slots=3").peer_addr(peer()).to_request();
        let servers: Vec<ServerRecord> = test::call_and_read_body_json(&app, req).await;
        let addresses: Vec<&str> = servers.iter().map(|s| s.address.as_str()).collect();
        assert_eq!(addresses, vec!["1.2.3.4:7777"]);

        let req = test::TestRequest::get().uri("/servers?game_id=2").peer_addr(peer()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/servers?limit=1").peer_addr(peer()).to_request();
        let servers: Vec<ServerRecord> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(servers.len(), 1);
    }

    #[actix_web::test]
    async fn lookup_checkin_and_delete_by_address() {
        let storage = Arc::new(ServerStorage::new(0));
        let app = app!(storage.clone());

        let req = test::TestRequest::get().uri("/servers/9.9.9.9:1234").peer_addr(peer()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::put().uri("/servers/1.2.3.4:7777").peer_addr(peer()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post().uri("/servers").peer_addr(peer()).set_json(announce(7777, 0)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        storage.mark_inactive(chrono::Utc::now() + chrono::Duration::seconds(1)).unwrap();

        let req = test::TestRequest::put().uri("/servers/1.2.3.4:7777").peer_addr(peer()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let server: ServerRecord = test::read_body_json(resp).await;
        assert!(server.active);

        let req = test::TestRequest::get().uri("/servers/1.2.3.4:7777").peer_addr(peer()).to_request();
        let server: ServerRecord = test::call_and_read_body_json(&app, req).await;
        assert_eq!(server.map, "m1");

        let req = test::TestRequest::delete().uri("/servers/1.2.3.4:7777").peer_addr(peer()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        let req = test::TestRequest::get().uri("/servers/1.2.3.4:7777").peer_addr(peer()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn host_limit_is_bad_request() {
        let app = app!(Arc::new(ServerStorage::new(1)));

        let req = test::TestRequest::post().uri("/servers").peer_addr(peer()).set_json(announce(7777, 0)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        let req = test::TestRequest::post().uri("/servers").peer_addr(peer()).set_json(announce(7778, 0)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn exhausted_quota_is_too_many_requests_per_client() {
        let config = Config {
            server_list_period_secs: 3600,
            server_list_burst_limit: 1,
            ..Default::default()
        };
        let app = app!(Arc::new(ServerStorage::new(0)), config);

        let req = test::TestRequest::get().uri("/servers/9.9.9.9:1234").peer_addr(peer()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/servers/9.9.9.9:1234").peer_addr(peer()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::TOO_MANY_REQUESTS);

        // limits are keyed per client address
        let other: SocketAddr = "5.6.7.8:40000".parse().unwrap();
        let req = test::TestRequest::get().uri("/servers/9.9.9.9:1234").peer_addr(other).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        // registration has its own quota
        let req = test::TestRequest::post().uri("/servers").peer_addr(peer()).set_json(announce(7777, 0)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }
}
