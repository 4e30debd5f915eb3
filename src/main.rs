//! higawari-bot binary entrypoint wiring the chat relay, the challenge store and the webhook server.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use higawari_bot::{
    chat::{RelayChatGateway, RelayConfig},
    config::AppConfig,
    dao::challenge_store::{ChallengeStore, MemoryChallengeStore},
    i18n::Catalog,
    routes,
    services::{status_service, storage_supervisor},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("reading configuration")?;
    let store = open_store(&config).await?;
    let chat = RelayChatGateway::new(RelayConfig {
        base_url: config.relay_url.clone(),
        token: config.token.clone(),
    })
    .context("building chat relay client")?;
    let texts = Catalog::load(&config.locales_dir, &config.locale);
    info!(locale = texts.locale(), "text catalog ready");

    let round = AppState::load_round(store.as_ref())
        .await
        .context("loading round state")?;
    let app_state = AppState::new(
        store,
        Arc::new(chat),
        Arc::new(texts),
        config.channels.clone(),
        config.token.clone(),
        round,
    );

    status_service::refresh(&app_state).await;
    tokio::spawn(storage_supervisor::run(app_state.clone()));

    let app = build_router(app_state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Connect to MongoDB when a URI is configured, otherwise keep everything in memory.
async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ChallengeStore>> {
    match config.db_uri.as_deref() {
        #[cfg(feature = "mongo-store")]
        Some(uri) => {
            use higawari_bot::dao::challenge_store::mongodb::{MongoChallengeStore, MongoConfig};

            let mongo_config = MongoConfig::from_uri(uri, config.db_name.as_deref())
                .await
                .context("parsing MongoDB URI")?;
            let store = MongoChallengeStore::connect(mongo_config)
                .await
                .context("connecting to MongoDB")?;
            info!("using MongoDB challenge store");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongo-store"))]
        Some(_) => anyhow::bail!("a database URI is configured but the `mongo-store` feature is disabled"),
        None => {
            warn!("no database URI configured; round state will not survive a restart");
            Ok(Arc::new(MemoryChallengeStore::new()))
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state).layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
