use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use bisca_server::adapters::records_api::HttpRecordsApi;
use bisca_server::config::AppConfig;
use bisca_server::middleware::cors::cors_middleware;
use bisca_server::routes;
use bisca_server::state::app_state::AppState;
use bisca_server::telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Environment variables must be set by the runtime environment:
    // - Docker: via docker-compose env_file or docker run --env-file
    // - Local dev: source env files manually (e.g., set -a; . ./.env; set +a)
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    let host = config.server.host.clone();
    let port = config.server.port;

    println!("🚀 Starting Bisca realtime server on http://{host}:{port}");

    let records = Arc::new(HttpRecordsApi::new(config.server.records_api_url.clone()));
    let app_state = AppState::new(config, records);

    let data = web::Data::new(app_state);

    HttpServer::new(move || {
        App::new()
            .wrap(cors_middleware())
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
