//! Application entry point for the `airhive-sensorql` service.
//!
//! This binary orchestrates the full startup sequence, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Establishing the MySQL connection pool and pinging it (startup aborts
//!   if the database is unreachable)
//! - Building the GraphQL schema once for the lifetime of the process
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving until Ctrl-C / SIGTERM
//!
//! # Environment Variables
//! - `DATABASE_URL` (**required**) – MySQL connection string
//! - `DB_POOL_MAX` (optional) – maximum number of DB connections (default: 20)
//! - `SENSORQL_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `SENSORQL_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See [`airhive_sensorql::config`] for the full list.
use std::{env, sync::Arc};

use dotenvy::dotenv;
use is_terminal::IsTerminal;
use sqlx::{mysql::MySqlPoolOptions, Connection};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

use airhive_sensorql::{build_schema, config, routes, MySqlSensorStore, SensorStore};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    tracing::info!("Attempting to connect to database: {}", cfg.masked_db_url());

    let pool = MySqlPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .min_connections(cfg.db_pool_min_idle)
        .max_lifetime(cfg.db_conn_max_lifetime)
        .connect(&cfg.db_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    let mut conn = pool.acquire().await?;
    conn.ping()
        .await
        .map_err(|e| anyhow::anyhow!("Database did not answer ping: {}", e))?;
    drop(conn);

    tracing::info!("Successfully connected to database");

    let store: Arc<dyn SensorStore> = Arc::new(MySqlSensorStore::new(pool.clone()));
    let schema = build_schema(store, cfg.merge_policy())
        .map_err(|e| anyhow::anyhow!("Failed to build GraphQL schema: {}", e))?;

    let addr = cfg.listen_addr;
    let app = routes::router(schema, &cfg);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Database pool closed, shutting down");

    Ok(())
}

// ---

/// Resolve once Ctrl-C or SIGTERM is received.
async fn shutdown_signal() {
    // ---
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

/// Install the compact `tracing` subscriber used by the service.
///
/// Every event carries its target and source location so a failing location
/// lookup can be traced back to the resolver that logged it. Knobs:
/// - `RUST_LOG` wins when set; otherwise `SENSORQL_LOG_LEVEL` picks one of
///   `trace`/`debug`/`info`/`warn`/`error` (default `debug`) and sqlx
///   statement logging is held at `warn`
/// - `SENSORQL_SPAN_EVENTS=full` logs span enter, exit and close;
///   `enter_exit` drops the close event; anything else logs close only,
///   which is enough to time each `query` and `location` span
/// - `FORCE_COLOR` overrides TTY detection for ANSI output
///
/// Must run before the first log line, so it precedes `.env` loading.
fn init_tracing() {
    // ---
    let span_events = match env::var("SENSORQL_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to SENSORQL_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("SENSORQL_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
