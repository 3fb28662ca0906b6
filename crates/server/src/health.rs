use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use hcplog_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub checked_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new()
        .route("/health", get(liveness))
        .route("/health/db", get(readiness))
        .with_state(HealthState { db_pool })
}

pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok",
        service: "hcplog-server",
        checked_at: Utc::now().to_rfc3339(),
    })
}

pub async fn readiness(State(state): State<HealthState>) -> (StatusCode, Json<ReadinessResponse>) {
    let database = database_check(&state.db_pool).await;
    let ready = database.status == "ok";

    let payload = ReadinessResponse {
        status: if ready { "ok" } else { "error" },
        database,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ok", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "error", detail: format!("database query failed: {error}") }
        }
    }
}
