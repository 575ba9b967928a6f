//! Shopfloor API server binary.
//!
//! Serves the HTTP API over PostgreSQL, or over an in-memory store for local
//! experiments (`--store memory`, nothing survives a restart).

use clap::{Parser, ValueEnum};
use shopfloor_api::config::ApiConfig;
use shopfloor_core::store::Stores;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Postgres,
    Memory,
}

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "shopfloor_server", about = "Shopfloor job order API server")]
struct Args {
    /// Port to listen on (0 = ephemeral). Overrides the port in `BIND_ADDR`.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Document store backend.
    #[arg(long, value_enum, env = "SHOPFLOOR_STORE", default_value_t = StoreKind::Postgres)]
    store: StoreKind,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

fn bind_addr(config: &ApiConfig, port: Option<u16>) -> String {
    match port {
        Some(port) => {
            let host = config
                .bind_addr
                .rsplit_once(':')
                .map_or("127.0.0.1", |(host, _)| host);
            format!("{host}:{port}")
        }
        None => config.bind_addr.clone(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,shopfloor_api=debug,shopfloor_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    config.bind_addr = bind_addr(&config, args.port);

    let stores = match args.store {
        StoreKind::Postgres => {
            info!(max_connections = args.max_connections, "configuring connection pool");
            let pool = PgPoolOptions::new()
                .max_connections(args.max_connections)
                .acquire_timeout(std::time::Duration::from_secs(30))
                .connect(&config.database_url)
                .await?;

            info!("running database migrations");
            shopfloor_api::migrate(&pool).await?;
            Stores::postgres(pool)
        }
        StoreKind::Memory => {
            warn!("using in-memory store; data is lost on exit");
            Stores::memory()
        }
    };

    let state = shopfloor_api::AppState::new(config.clone(), stores);
    let app = shopfloor_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, store = ?args.store, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
