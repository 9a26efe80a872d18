mod config;
mod seed;

use std::net::SocketAddr;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use bloodbridge_api::AppStateInner;
use bloodbridge_db::Database;
use bloodbridge_notify::Notifier;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bloodbridge_server=debug,bloodbridge_api=debug,bloodbridge_db=info,bloodbridge_notify=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;
    info!("Starting BloodBridge ({:?})", config.environment);

    let db = open_database(&config)?;
    let notifier = Notifier::new(config.notifier.clone())?;

    let state = AppStateInner::new(db, notifier, config.jwt_secret.clone(), config.session_ttl);

    if config.seed_demo {
        let seed_state = state.clone();
        let seeded = tokio::task::spawn_blocking(move || seed::seed_demo(&seed_state.db)).await?;
        if let Err(e) = seeded {
            warn!("Demo seed failed: {:#}", e);
        }
    }

    let app = bloodbridge_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("BloodBridge listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Open the configured database, degrading to in-memory storage when the file
/// cannot be opened.
fn open_database(config: &Config) -> anyhow::Result<Database> {
    let Some(path) = &config.db_path else {
        info!("Using in-memory database");
        return Database::open_in_memory();
    };

    match Database::open(path) {
        Ok(db) => Ok(db),
        Err(e) => {
            warn!(
                "Could not open database at {}: {:#}. Falling back to in-memory storage, data will not persist",
                path.display(),
                e
            );
            Database::open_in_memory()
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unopenable_database_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::from_lookup(|_| None).unwrap();
        // A directory cannot be opened as a database file.
        config.db_path = Some(dir.path().to_path_buf());

        let db = open_database(&config).unwrap();
        assert_eq!(db.count_users().unwrap(), 0);
        assert_eq!(db.get_inventory().unwrap().len(), 8);
    }
}
