//! Plain CRUD over interactions. These handlers are not agent tools and
//! write no tool runs.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Map, Value};

use hcplog_core::domain::interaction::{Interaction, InteractionId, NewInteraction};
use hcplog_core::errors::DomainError;

use crate::error::ApiError;
use crate::state::{correlation_id, AppState};

/// Rows returned by `GET /interactions`.
pub const INTERACTION_LISTING_LIMIT: u32 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/interactions", get(list_interactions).post(create_interaction))
        .route("/interactions/{id}", get(get_interaction).put(update_interaction))
}

pub async fn list_interactions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Interaction>>, ApiError> {
    let interactions = state
        .repos
        .interactions
        .list_interactions(INTERACTION_LISTING_LIMIT)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id(&headers)))?;
    Ok(Json(interactions))
}

pub async fn get_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Interaction>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let interaction_id = InteractionId(id);
    state
        .repos
        .interactions
        .find_interaction(interaction_id)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?
        .map(Json)
        .ok_or_else(|| {
            ApiError::from_application(DomainError::InteractionNotFound(interaction_id), &correlation_id)
        })
}

pub async fn create_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewInteraction>, JsonRejection>,
) -> Result<(StatusCode, Json<Interaction>), ApiError> {
    let correlation_id = correlation_id(&headers);
    let Json(new_interaction) =
        payload.map_err(|rejection| ApiError::rejected(rejection, &correlation_id))?;

    let hcp_id = new_interaction.hcp_id;
    let known = state
        .repos
        .hcps
        .find_hcp(hcp_id)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;
    if known.is_none() {
        return Err(ApiError::from_application(DomainError::HcpNotFound(hcp_id), &correlation_id));
    }

    let interaction = state
        .repos
        .interactions
        .create_interaction(new_interaction, None)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;
    Ok((StatusCode::CREATED, Json(interaction)))
}

/// Same allow-list and policy as the agent edit tool.
pub async fn update_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Interaction>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let Json(raw_patch) =
        payload.map_err(|rejection| ApiError::rejected(rejection, &correlation_id))?;
    let interaction_id = InteractionId(id);

    let patch = state
        .guardrails
        .check_patch(&raw_patch)
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;
    state
        .repos
        .interactions
        .update_interaction(interaction_id, &patch, None)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?
        .map(Json)
        .ok_or_else(|| {
            ApiError::from_application(DomainError::InteractionNotFound(interaction_id), &correlation_id)
        })
}
