use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use serde_json::Value;

use hcplog_agent::{GuardrailPolicy, LlmClient};
use hcplog_core::domain::interaction::PatchPolicy;
use hcplog_db::{connect_with_settings, migrations, DemoHcpDataset};

use crate::routes;
use crate::state::AppState;

/// Replays queued completions in order; an exhausted script fails the call.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<anyhow::Result<String>>>,
}

impl ScriptedLlm {
    pub fn replying(replies: &[&str]) -> Arc<Self> {
        let queue = replies.iter().map(|reply| Ok(reply.to_string())).collect();
        Arc::new(Self { replies: Mutex::new(queue) })
    }

    pub fn failing() -> Arc<Self> {
        let queue = VecDeque::from([Err(anyhow!("connection refused"))]);
        Arc::new(Self { replies: Mutex::new(queue) })
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        self.replies
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no scripted reply left")))
    }
}

pub async fn seeded_state(llm: Arc<dyn LlmClient>, policy: PatchPolicy) -> AppState {
    let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
    migrations::run_pending(&pool).await.expect("migrations should apply");
    DemoHcpDataset::load(&pool).await.expect("demo hcps should load");
    AppState::new(pool, llm, GuardrailPolicy::new(policy))
}

pub fn app(state: AppState) -> Router {
    routes::router(state, &["http://localhost:3000".to_string()])
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).expect("request")
}

pub fn send_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}
