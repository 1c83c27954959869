//! Health Check Handlers
//!
//! - `GET /health` and `GET /health/live`: the process answers
//! - `GET /health/ready`: store, cache and broker reachability plus the number
//!   of live sessions; 503 when messages could not be delivered

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::startup::AppState;

static STARTED: Lazy<(Instant, DateTime<Utc>)> = Lazy::new(|| (Instant::now(), Utc::now()));

/// Pin the uptime clock to process start rather than the first request.
pub fn init_server_start() {
    Lazy::force(&STARTED);
}

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Ordered from best to worst so the overall grade is a `max`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct Liveness {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub checks: Checks,
}

#[derive(Debug, Serialize)]
pub struct Checks {
    pub database: Dependency,
    pub redis: Dependency,
    pub broker: Dependency,
    pub websocket: Sessions,
}

/// Outcome of pinging one backend.
#[derive(Debug, Serialize)]
pub struct Dependency {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Sessions {
    pub active_sessions: usize,
}

pub async fn health_check() -> Json<Liveness> {
    Json(Liveness {
        status: "healthy",
        version: VERSION,
    })
}

pub async fn liveness() -> Json<Liveness> {
    Json(Liveness {
        status: "alive",
        version: VERSION,
    })
}

pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let (started, started_at) = *STARTED;

    let (database, redis, broker) = tokio::join!(
        ping("Database", 100, state.store.ping()),
        ping("Redis", 50, state.cache.ping()),
        ping("Broker", 50, state.broker.ping()),
    );
    let status = overall(&database, &redis, &broker);

    let body = Readiness {
        status,
        version: VERSION,
        uptime_seconds: started.elapsed().as_secs(),
        started_at: started_at.to_rfc3339(),
        checks: Checks {
            database,
            redis,
            broker,
            websocket: Sessions {
                active_sessions: state.registry.session_count(),
            },
        },
    };

    let code = if status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(body))
}

/// Ping one backend; slower than `degraded_after_ms` counts as degraded.
async fn ping<E: Display>(
    name: &str,
    degraded_after_ms: u64,
    call: impl Future<Output = Result<(), E>>,
) -> Dependency {
    let start = Instant::now();
    match call.await {
        Ok(()) => {
            let latency = start.elapsed().as_millis() as u64;
            Dependency {
                status: if latency < degraded_after_ms {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded
                },
                latency_ms: Some(latency),
                error: None,
            }
        }
        Err(e) => Dependency {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            error: Some(format!("{} connection failed: {}", name, e)),
        },
    }
}

/// Store and broker carry every message; a cache outage only slows history
/// reads, so it never grades worse than degraded.
fn overall(database: &Dependency, cache: &Dependency, broker: &Dependency) -> HealthStatus {
    database
        .status
        .max(broker.status)
        .max(cache.status.min(HealthStatus::Degraded))
}
