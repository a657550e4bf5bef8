// src/main.rs
use actix_web::{App, HttpServer, middleware::Logger, web};
use moka::future::Cache;
use sqlx::PgPool;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod auth;
mod config;
mod db;
mod error;
mod models;
mod pricing;
mod publish;
mod purchases;
mod routes;
mod store;
mod unlock;
mod wallet;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    tracing::info!("Starting chapter ticket service");

    dotenv::dotenv().ok();
    let config = config::Config::from_env().expect("Failed to load config from environment");

    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    let cache: Cache<String, serde_json::Value> = Cache::new(1000);
    let paywall_store = store::PgStore::new(pool.clone());

    tokio::spawn(publish::run_sweep_loop(
        pool.clone(),
        Duration::from_secs(config.publish_sweep_secs),
    ));

    if config.enable_mock_topup {
        tracing::warn!("Mock top-up route is enabled; do not run this in production");
    }

    let bind_addr = config.bind_addr.clone();
    let enable_mock_topup = config.enable_mock_topup;

    HttpServer::new(move || {
        let app = App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(paywall_store.clone()))
            .app_data(web::Data::new(cache.clone()))
            .app_data(web::Data::new(config.clone()))
            .wrap(Logger::default())
            .configure(routes::init_routes);
        if enable_mock_topup {
            app.configure(routes::init_dev_routes)
        } else {
            app
        }
    })
    .bind(bind_addr)?
    .run()
    .await
}
