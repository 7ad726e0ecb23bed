use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use clubhouse_server::auth::TokenService;
use clubhouse_server::config::settings;
use clubhouse_server::db::{MemoryStore, PgStore, Store};
use clubhouse_server::engine::{ClubEngine, EngineRules};
use clubhouse_server::{http, metrics};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cfg = settings();

    // Store: Postgres when configured, otherwise a throwaway in-memory one
    let store: Arc<dyn Store> = match &cfg.database_url {
        Some(url) => {
            let pg = PgStore::connect(url, cfg.db_max_connections).await?;
            pg.migrate().await?;
            Arc::new(pg)
        }
        None => {
            log::warn!("DATABASE_URL not set; using in-memory store (data is lost on exit)");
            Arc::new(MemoryStore::new())
        }
    };

    let tokens = TokenService::new(cfg.jwt_secret.as_bytes(), cfg.jwt_ttl_secs)
        .context("JWT_SECRET must be set to at least 32 bytes")?;
    let engine = web::Data::new(ClubEngine::new(store, tokens, EngineRules::from(cfg)));

    log::info!("listening on {}", cfg.server_addr);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(metrics::METRICS.clone())
            .app_data(engine.clone())
            .configure(http::routes::init_routes)
    })
    .bind(&cfg.server_addr)
    .with_context(|| format!("binding {}", cfg.server_addr))?
    .run()
    .await
    .context("HTTP server")?;

    Ok(())
}
