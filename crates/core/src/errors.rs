use thiserror::Error;

use crate::domain::hcp::HcpId;
use crate::domain::interaction::{InteractionId, PatchError};
use crate::flows::FlowTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("hcp {0} not found")]
    HcpNotFound(HcpId),
    #[error("interaction {0} not found")]
    InteractionNotFound(InteractionId),
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("upstream service failure: {0}")]
    Upstream(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("unprocessable: {message}")]
    Unprocessable { message: String, correlation_id: String },
    #[error("upstream unavailable: {message}")]
    BadGateway { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The referenced record does not exist.",
            Self::Unprocessable { .. } => "The request was understood but could not be applied.",
            Self::BadGateway { .. } => {
                "The language model service is unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Unprocessable { correlation_id, .. }
            | Self::BadGateway { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }

    /// Detail that is safe to return to callers. Internal failures only expose
    /// the generic message.
    pub fn public_detail(&self) -> String {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::Unprocessable { message, .. } => message.clone(),
            Self::BadGateway { .. } | Self::Internal { .. } => self.user_message().to_owned(),
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Unprocessable { correlation_id: id, .. }
            | InterfaceError::BadGateway { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Domain(DomainError::HcpNotFound(_))
                | Self::Domain(DomainError::InteractionNotFound(_))
        )
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = || "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error @ DomainError::HcpNotFound(_))
            | ApplicationError::Domain(error @ DomainError::InteractionNotFound(_)) => {
                Self::NotFound { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Domain(DomainError::Patch(error)) => {
                Self::Unprocessable { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Domain(DomainError::InvariantViolation(message)) => {
                Self::BadRequest { message, correlation_id: unassigned() }
            }
            ApplicationError::Domain(DomainError::FlowTransition(error)) => {
                Self::Internal { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Upstream(message) => {
                Self::BadGateway { message, correlation_id: unassigned() }
            }
            ApplicationError::Persistence(message) => {
                Self::Internal { message, correlation_id: unassigned() }
            }
        }
    }
}
