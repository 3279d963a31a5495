use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use promptleague::api::{self, ApiState, Persistence};
use promptleague::auth::AuthConfig;
use promptleague::clock::SystemClock;
use promptleague::competition::Competition;
use promptleague::config::AppConfig;
use promptleague::store::export::StoreSnapshot;
use promptleague::store::MemoryStore;

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "promptleague=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting promptleague...");

    let config = AppConfig::from_env();
    let auth_config = Arc::new(AuthConfig::from_env());

    let store = match &config.snapshot_path {
        Some(path) if path.exists() => {
            let loaded = StoreSnapshot::read_from(path)
                .await
                .and_then(MemoryStore::from_snapshot);
            match loaded {
                Ok(store) => {
                    tracing::info!("Restored store from {}", path.display());
                    store
                }
                Err(e) => {
                    tracing::error!("Refusing to start with unreadable snapshot: {}", e);
                    std::process::exit(1);
                }
            }
        }
        _ => MemoryStore::new(),
    };

    let competition = Competition::new(Arc::new(store.clone()), Arc::new(SystemClock));
    let state = Arc::new(ApiState {
        competition,
        persistence: config
            .snapshot_path
            .clone()
            .map(|path| Persistence::new(store.clone(), path)),
    });

    if let Some(interval) = config.advance_interval {
        spawn_periodic_trigger(state.clone(), interval);
    }

    let app = api::router(state, auth_config).layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", config.bind_addr);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.bind_addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}

/// Stand-in for an external cron: calls the trigger on a fixed cadence
fn spawn_periodic_trigger(state: Arc<ApiState>, interval: Duration) {
    tracing::info!("Periodic trigger every {:?}", interval);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let summary = state.run_trigger(None).await;
            for failure in &summary.errors {
                tracing::warn!(
                    league_id = ?failure.league_id,
                    kind = ?failure.kind,
                    "Trigger failure: {}",
                    failure.message
                );
            }
        }
    });
}
