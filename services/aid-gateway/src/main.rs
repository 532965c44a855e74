use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use aid_gateway::{config::Config, handlers};
use aid_ledger::Ledger;
use anyhow::Context;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Aid Gateway...");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        funding_policy = ?config.ledger.funding_policy,
        storage = ?config.ledger.storage,
        "Configuration loaded successfully"
    );

    let ledger = Ledger::open(config.ledger.clone())
        .await
        .context("Failed to open ledger")?;
    let ledger = web::Data::new(ledger);

    let server_config = config.server.clone();
    info!(
        "Starting HTTP server on {}:{}",
        server_config.host, server_config.port
    );

    let origins = server_config.allowed_origins.clone();
    let app_ledger = ledger.clone();
    HttpServer::new(move || {
        let cors = if origins.is_empty() {
            Cors::default().allow_any_origin()
        } else {
            origins
                .iter()
                .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        };

        App::new()
            .app_data(app_ledger.clone())
            .wrap(
                cors.allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(middleware::Logger::default())
            .configure(handlers::configure_routes)
    })
    .workers(server_config.workers)
    .bind((server_config.host, server_config.port))?
    .run()
    .await?;

    ledger.shutdown().await?;
    info!("Aid Gateway stopped");
    Ok(())
}
