use std::sync::Arc;

use axum::http::HeaderMap;
use uuid::Uuid;

use hcplog_agent::{AgentRuntime, GuardrailPolicy, LlmClient};
use hcplog_db::{DbPool, Repositories};

pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub repos: Repositories,
    pub runtime: Arc<AgentRuntime>,
    pub guardrails: GuardrailPolicy,
}

impl AppState {
    pub fn new(db_pool: DbPool, llm: Arc<dyn LlmClient>, guardrails: GuardrailPolicy) -> Self {
        let repos = Repositories::sql(db_pool.clone());
        let runtime = Arc::new(AgentRuntime::new(repos.clone(), llm, guardrails.clone()));
        Self { db_pool, repos, runtime, guardrails }
    }
}

/// Reuses the caller's correlation id when one is sent, otherwise mints one.
pub fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
