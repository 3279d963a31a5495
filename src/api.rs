//! HTTP surface of the trigger host.
//!
//! The engine does not schedule itself; a cron job (or the built-in ticker in
//! `main`) calls `POST /api/transitions/process` on whatever cadence it likes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::auth::{trigger_auth_middleware, AuthConfig};
use crate::competition::{AdvanceSummary, Competition};
use crate::store::MemoryStore;

/// Where to persist the in-memory store after state changes
#[derive(Clone)]
pub struct Persistence {
    pub store: MemoryStore,
    pub path: PathBuf,
    /// Overlapping trigger runs save one at a time, newest snapshot last
    write_lock: Arc<Mutex<()>>,
}

impl Persistence {
    pub fn new(store: MemoryStore, path: PathBuf) -> Self {
        Self {
            store,
            path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn save(&self) {
        let _guard = self.write_lock.lock().await;
        let snapshot = self.store.snapshot().await;
        match snapshot.write_to(&self.path).await {
            Ok(()) => tracing::debug!("Snapshot written to {}", self.path.display()),
            Err(e) => tracing::error!("Failed to write snapshot: {}", e),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub competition: Competition,
    pub persistence: Option<Persistence>,
}

impl ApiState {
    /// Run one trigger pass and persist if anything moved
    pub async fn run_trigger(&self, league_id: Option<&str>) -> AdvanceSummary {
        let summary = self.competition.process_due_transitions(league_id).await;
        if summary.changed() {
            tracing::info!(
                leagues = summary.leagues_advanced.len(),
                published = summary.prompts_published.len(),
                finalized = summary.prompts_finalized.len(),
                activated = summary.prompts_activated.len(),
                "Trigger advanced leagues"
            );
            if let Some(persistence) = &self.persistence {
                persistence.save().await;
            }
        }
        summary
    }
}

#[derive(Debug, Deserialize)]
pub struct ProcessParams {
    pub league_id: Option<String>,
}

/// Process due transitions.
///
/// POST /api/transitions/process[?league_id=...]
pub async fn process_transitions(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<ProcessParams>,
) -> Json<AdvanceSummary> {
    Json(state.run_trigger(params.league_id.as_deref()).await)
}

/// GET /api/leagues/{league_id}/phase
pub async fn league_phase(
    State(state): State<Arc<ApiState>>,
    Path(league_id): Path<String>,
) -> Response {
    match state.competition.phase_status(&league_id).await {
        Ok(Some(status)) => Json(status).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) if e.is_configuration() => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
        Err(e) => {
            tracing::error!(league_id = %league_id, "Failed to read phase: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// GET /api/leagues/{league_id}/standings
pub async fn league_standings(
    State(state): State<Arc<ApiState>>,
    Path(league_id): Path<String>,
) -> Response {
    match state.competition.league_standings(&league_id).await {
        Ok(standings) => Json(standings).into_response(),
        Err(e) => {
            tracing::error!(league_id = %league_id, "Failed to compute standings: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn health() -> &'static str {
    "ok"
}

pub fn router(state: Arc<ApiState>, auth_config: Arc<AuthConfig>) -> Router {
    let trigger_routes = Router::new()
        .route("/api/transitions/process", post(process_transitions))
        .layer(middleware::from_fn_with_state(
            auth_config,
            trigger_auth_middleware,
        ));

    Router::new()
        .merge(trigger_routes)
        .route("/api/leagues/{league_id}/phase", get(league_phase))
        .route("/api/leagues/{league_id}/standings", get(league_standings))
        .route("/health", get(health))
        .with_state(state)
}
