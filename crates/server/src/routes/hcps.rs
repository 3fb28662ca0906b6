use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};

use hcplog_core::domain::hcp::{Hcp, HcpId};
use hcplog_core::errors::DomainError;

use crate::error::ApiError;
use crate::state::{correlation_id, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/hcps", get(list_hcps)).route("/hcps/{id}", get(get_hcp))
}

pub async fn list_hcps(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Hcp>>, ApiError> {
    let hcps = state
        .repos
        .hcps
        .list_hcps()
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id(&headers)))?;
    Ok(Json(hcps))
}

pub async fn get_hcp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Hcp>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let hcp_id = HcpId(id);
    state
        .repos
        .hcps
        .find_hcp(hcp_id)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?
        .map(Json)
        .ok_or_else(|| ApiError::from_application(DomainError::HcpNotFound(hcp_id), &correlation_id))
}
