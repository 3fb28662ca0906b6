use serde_json::{Map, Value};

use hcplog_core::domain::hcp::HcpId;
use hcplog_core::domain::interaction::{InteractionPatch, PatchPolicy};
use hcplog_core::errors::DomainError;

/// Input checks applied before any tool runs. A rejected request writes no
/// tool runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub patch_policy: PatchPolicy,
}

impl GuardrailPolicy {
    pub fn new(patch_policy: PatchPolicy) -> Self {
        Self { patch_policy }
    }

    /// Ids are database rowids; zero and negatives never name an HCP.
    pub fn check_chat(&self, hcp_id: Option<i64>) -> Result<HcpId, DomainError> {
        match hcp_id {
            Some(id) if id > 0 => Ok(HcpId(id)),
            _ => Err(DomainError::InvariantViolation("hcp_id is required".to_string())),
        }
    }

    pub fn check_patch(&self, raw: &Map<String, Value>) -> Result<InteractionPatch, DomainError> {
        Ok(InteractionPatch::from_json(raw, self.patch_policy)?)
    }
}
