use std::sync::Arc;

use hcplog_agent::{GuardrailPolicy, HttpLlmClient, LlmClient};
use hcplog_core::config::{AppConfig, ConfigError};
use hcplog_db::{connect_with_config, migrations, DbPool};
use thiserror::Error;
use tracing::info;

use crate::state::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("language model client setup failed: {0:#}")]
    LlmClient(#[source] anyhow::Error),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        llm_provider = ?config.llm.provider,
        llm_model = %config.llm.model,
        "starting application bootstrap"
    );
    let llm: Arc<dyn LlmClient> =
        Arc::new(HttpLlmClient::from_config(&config.llm).map_err(BootstrapError::LlmClient)?);
    bootstrap_with_llm(config, llm).await
}

/// Connects, migrates, and wires the agent runtime around `llm`.
pub async fn bootstrap_with_llm(
    config: AppConfig,
    llm: Arc<dyn LlmClient>,
) -> Result<Application, BootstrapError> {
    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let patch_policy = config.agent.patch_policy();
    let state = AppState::new(db_pool.clone(), llm, GuardrailPolicy::new(patch_policy));
    Ok(Application { config, db_pool, state })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use hcplog_agent::{ChatRequest, LlmClient};
    use hcplog_core::config::{AppConfig, ConfigOverrides, LlmProvider, LoadOptions};
    use hcplog_db::DemoHcpDataset;

    use crate::bootstrap::{bootstrap_with_config, bootstrap_with_llm, BootstrapError};

    struct FixedLlm;

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            if prompt.starts_with("Suggest") {
                Ok("Send the dosing guide".to_string())
            } else {
                Ok(r#"{"interaction_type": "call", "topics": "dosing"}"#.to_string())
            }
        }
    }

    fn overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                llm_provider: Some(LlmProvider::Ollama),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_builds_http_client_for_keyless_provider() {
        let config = AppConfig::load(overrides("sqlite::memory:")).expect("config should load");
        let app = bootstrap_with_config(config).await.expect("bootstrap should succeed");

        assert_eq!(app.config.llm.resolved_base_url(), "http://localhost:11434/v1");
        app.db_pool.close().await;
    }

    #[test]
    fn hosted_provider_without_key_fails_before_connecting() {
        let error = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                llm_provider: Some(LlmProvider::Groq),
                llm_api_key: Some(String::new()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect_err("groq needs a key");

        assert!(BootstrapError::from(error).to_string().contains("llm.api_key"));
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_serves_a_chat() {
        let config = AppConfig::load(overrides("sqlite::memory:")).expect("config should load");
        let app = bootstrap_with_llm(config, Arc::new(FixedLlm))
            .await
            .expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('hcps', 'interactions', 'agent_tool_runs')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("tables should exist after bootstrap");
        assert_eq!(table_count, 3);

        DemoHcpDataset::load(&app.db_pool).await.expect("seed");
        let response = app
            .state
            .runtime
            .run_chat(
                ChatRequest { message: "Called Dr. Lee about dosing".to_string(), hcp_id: Some(1) },
                "bootstrap-test",
            )
            .await
            .expect("chat");
        assert_eq!(response.reply, "Logged. Follow-ups: Send the dosing guide");

        app.db_pool.close().await;
    }
}
