mod applications;
mod auth;
mod config;
mod errors;
mod jobs;
mod mail;
mod models;
mod reports;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::applications::upload::UploadStore;
use crate::auth::sessions::SessionStore;
use crate::config::Config;
use crate::mail::{LogMailer, Mailer, SmtpMailer};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{MemStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Jobboard API v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(PgStore::connect(url).await?),
        None => {
            warn!("DATABASE_URL not set; using in-memory store, data will not survive restart");
            Arc::new(MemStore::new())
        }
    };

    // First boot creates the bootstrap admin; subsequent boots are no-ops.
    auth::service::ensure_default_admin(store.as_ref()).await?;

    let mailer: Arc<dyn Mailer> = match &config.smtp_host {
        Some(host) => Arc::new(SmtpMailer::new(&config, host)?),
        None => {
            info!("SMTP_HOST not set; password-reset mail will be logged");
            Arc::new(LogMailer)
        }
    };

    let state = AppState {
        store,
        sessions: SessionStore::new(),
        mailer,
        uploads: UploadStore::new(config.upload_dir.clone()),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
