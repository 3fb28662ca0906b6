use thiserror::Error;

use hcplog_core::domain::interaction::PatchError;
use hcplog_core::errors::{ApplicationError, DomainError};
use hcplog_core::flows::FlowTransitionError;
use hcplog_db::RepositoryError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("language model call failed: {0:#}")]
    Llm(anyhow::Error),
}

impl From<PatchError> for AgentError {
    fn from(error: PatchError) -> Self {
        Self::Domain(error.into())
    }
}

impl From<FlowTransitionError> for AgentError {
    fn from(error: FlowTransitionError) -> Self {
        Self::Domain(error.into())
    }
}

impl From<AgentError> for ApplicationError {
    fn from(error: AgentError) -> Self {
        match error {
            AgentError::Domain(domain) => ApplicationError::Domain(domain),
            AgentError::Repository(repository) => repository.into(),
            AgentError::Llm(upstream) => ApplicationError::Upstream(format!("{upstream:#}")),
        }
    }
}
