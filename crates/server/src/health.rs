use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use awebot_db::DbPool;

/// What `/health` probes for storage readiness.
#[derive(Clone)]
pub enum StorageProbe {
    Memory,
    Sqlite(DbPool),
}

#[derive(Clone)]
pub struct HealthState {
    storage: StorageProbe,
    sink_mode: &'static str,
}

impl HealthState {
    pub fn new(storage: StorageProbe, sink_mode: &'static str) -> Self {
        Self { storage, sink_mode }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub storage: HealthCheck,
    pub sink: &'static str,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let storage = storage_check(&state.storage).await;
    let ready = storage.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck { status: "ready", detail: "awebot router initialized".to_owned() },
        storage,
        sink: state.sink_mode,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn storage_check(storage: &StorageProbe) -> HealthCheck {
    match storage {
        StorageProbe::Memory => {
            HealthCheck { status: "ready", detail: "in-memory profile store".to_owned() }
        }
        StorageProbe::Sqlite(pool) => match awebot_db::connection::ping(pool).await {
            Ok(()) => HealthCheck { status: "ready", detail: "database query succeeded".to_owned() },
            Err(error) => HealthCheck {
                status: "degraded",
                detail: format!("database query failed: {error}"),
            },
        },
    }
}
