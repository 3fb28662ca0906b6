use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use thiserror::Error;

use hcplog_core::audit::{InteractionAudit, NewToolRun, ToolRun};
use hcplog_core::domain::hcp::{Hcp, HcpId, NewHcp};
use hcplog_core::domain::interaction::{
    Interaction, InteractionId, InteractionPatch, NewInteraction,
};
use hcplog_core::errors::ApplicationError;

use crate::DbPool;

pub mod hcp;
pub mod interaction;
pub mod memory;
pub mod tool_run;

pub use hcp::SqlHcpRepository;
pub use interaction::SqlInteractionRepository;
pub use memory::InMemoryStore;
pub use tool_run::SqlToolRunRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("integrity error: {0}")]
    Integrity(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

#[async_trait]
pub trait HcpRepository: Send + Sync {
    async fn find_hcp(&self, id: HcpId) -> Result<Option<Hcp>, RepositoryError>;
    async fn list_hcps(&self) -> Result<Vec<Hcp>, RepositoryError>;
    async fn insert_hcp(&self, hcp: NewHcp) -> Result<Hcp, RepositoryError>;
}

#[async_trait]
pub trait InteractionRepository: Send + Sync {
    async fn find_interaction(
        &self,
        id: InteractionId,
    ) -> Result<Option<Interaction>, RepositoryError>;

    /// Newest first across all HCPs.
    async fn list_interactions(&self, limit: u32) -> Result<Vec<Interaction>, RepositoryError>;

    /// Newest first for one HCP.
    async fn list_interactions_for_hcp(
        &self,
        hcp_id: HcpId,
        limit: u32,
    ) -> Result<Vec<Interaction>, RepositoryError>;

    /// Inserts the row and, when `audit` is given, its tool run in the same
    /// transaction.
    async fn create_interaction(
        &self,
        interaction: NewInteraction,
        audit: Option<InteractionAudit>,
    ) -> Result<Interaction, RepositoryError>;

    /// Applies `patch` and refreshes `updated_at`. Returns `None` without
    /// writing anything when the interaction does not exist.
    async fn update_interaction(
        &self,
        id: InteractionId,
        patch: &InteractionPatch,
        audit: Option<InteractionAudit>,
    ) -> Result<Option<Interaction>, RepositoryError>;
}

#[async_trait]
pub trait ToolRunRepository: Send + Sync {
    async fn append_tool_run(&self, run: NewToolRun) -> Result<ToolRun, RepositoryError>;

    /// Newest first.
    async fn list_tool_runs(&self, limit: u32) -> Result<Vec<ToolRun>, RepositoryError>;

    /// Oldest first, in the order they were recorded.
    async fn list_tool_runs_for_interaction(
        &self,
        interaction_id: InteractionId,
    ) -> Result<Vec<ToolRun>, RepositoryError>;
}

/// The three stores the agent and the HTTP layer work against.
#[derive(Clone)]
pub struct Repositories {
    pub hcps: Arc<dyn HcpRepository>,
    pub interactions: Arc<dyn InteractionRepository>,
    pub tool_runs: Arc<dyn ToolRunRepository>,
}

impl Repositories {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            hcps: Arc::new(SqlHcpRepository::new(pool.clone())),
            interactions: Arc::new(SqlInteractionRepository::new(pool.clone())),
            tool_runs: Arc::new(SqlToolRunRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::default()))
    }

    pub fn from_store(store: Arc<InMemoryStore>) -> Self {
        Self { hcps: store.clone(), interactions: store.clone(), tool_runs: store }
    }
}

/// Current time at the precision the store keeps.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC3339 so that TEXT ordering matches time ordering.
pub(crate) fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}
