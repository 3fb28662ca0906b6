use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use hcplog_agent::{ChatRequest, ChatResponse, EditRequest, EditResponse};
use hcplog_core::audit::ToolRun;

use crate::error::ApiError;
use crate::state::{correlation_id, AppState};

/// Rows returned by `GET /agent/tool-runs`.
pub const TOOL_RUN_LISTING_LIMIT: u32 = 30;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolRunView {
    pub tool: String,
    pub output: Value,
    pub created_at: DateTime<Utc>,
}

impl From<ToolRun> for ToolRunView {
    fn from(run: ToolRun) -> Self {
        Self { tool: run.tool, output: run.output, created_at: run.created_at }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/agent/chat", post(chat))
        .route("/agent/edit", post(edit))
        .route("/agent/tool-runs", get(tool_runs))
}

pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let Json(request) = payload.map_err(|rejection| ApiError::rejected(rejection, &correlation_id))?;

    let response = state
        .runtime
        .run_chat(request, &correlation_id)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;
    Ok(Json(response))
}

pub async fn edit(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<EditRequest>, JsonRejection>,
) -> Result<Json<EditResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let Json(request) = payload.map_err(|rejection| ApiError::rejected(rejection, &correlation_id))?;

    let response = state
        .runtime
        .run_edit(request, &correlation_id)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;
    Ok(Json(response))
}

pub async fn tool_runs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ToolRunView>>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let runs = state
        .repos
        .tool_runs
        .list_tool_runs(TOOL_RUN_LISTING_LIMIT)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;
    Ok(Json(runs.into_iter().map(ToolRunView::from).collect()))
}
