//! The five agent tools. Each successful call appends exactly one tool run;
//! a call that fails appends nothing.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::debug;

use hcplog_core::audit::{InteractionAudit, NewToolRun, ToolName, ToolRun};
use hcplog_core::domain::hcp::{Hcp, HcpId};
use hcplog_core::domain::interaction::{
    Interaction, InteractionId, InteractionPatch, NewInteraction,
};
use hcplog_core::errors::DomainError;
use hcplog_core::flows::Extraction;
use hcplog_db::Repositories;

use crate::error::AgentError;
use crate::extraction::{extraction_prompt, parse_extraction};
use crate::llm::LlmClient;
use crate::suggestions::{
    parse_suggestions, suggestion_context, suggestion_prompt, SUGGESTION_HISTORY,
};

/// Interactions loaded as context for extraction.
pub const RECENT_HISTORY: u32 = 5;

#[derive(Clone)]
pub struct AgentTools {
    repos: Repositories,
    llm: Arc<dyn LlmClient>,
}

impl AgentTools {
    pub fn new(repos: Repositories, llm: Arc<dyn LlmClient>) -> Self {
        Self { repos, llm }
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    pub async fn get_hcp_profile(&self, hcp_id: HcpId) -> Result<Option<Hcp>, AgentError> {
        let profile = self.repos.hcps.find_hcp(hcp_id).await?;
        let output = match &profile {
            Some(hcp) => json!({
                "name": hcp.name,
                "specialty": hcp.specialty,
                "organization": hcp.organization,
            }),
            None => json!({}),
        };
        self.record(NewToolRun::new(ToolName::GetHcpProfile, output)).await?;
        Ok(profile)
    }

    pub async fn list_recent_interactions(
        &self,
        hcp_id: HcpId,
    ) -> Result<Vec<Interaction>, AgentError> {
        let recent = self.repos.interactions.list_interactions_for_hcp(hcp_id, RECENT_HISTORY).await?;
        let output = recent
            .iter()
            .map(|interaction| {
                json!({
                    "id": interaction.id,
                    "interaction_type": interaction.fields.interaction_type,
                    "topics": interaction.fields.topics,
                })
            })
            .collect::<Vec<_>>();
        self.record(NewToolRun::new(ToolName::ListRecentInteractions, Value::Array(output)))
            .await?;
        Ok(recent)
    }

    /// Not an audited tool: its result is recorded by `log_interaction`.
    pub async fn extract_interaction(&self, message: &str) -> Result<Extraction, AgentError> {
        let raw = self.llm.complete(&extraction_prompt(message)).await.map_err(AgentError::Llm)?;
        Ok(parse_extraction(&raw))
    }

    pub async fn log_interaction(
        &self,
        hcp_id: HcpId,
        extraction: &Extraction,
    ) -> Result<Interaction, AgentError> {
        let mut audit =
            InteractionAudit::new(ToolName::LogInteraction).with("fields", json!(extraction.fields));
        if let Some(reason) = &extraction.degraded {
            audit = audit.with("degraded", Value::String(reason.to_string()));
        }

        let interaction = self
            .repos
            .interactions
            .create_interaction(
                NewInteraction { hcp_id, fields: extraction.fields.clone() },
                Some(audit),
            )
            .await?;
        debug!(
            event_name = "agent.tool_run.recorded",
            tool = %ToolName::LogInteraction,
            interaction_id = interaction.id.0,
            "tool run recorded"
        );
        Ok(interaction)
    }

    pub async fn generate_followup_suggestions(
        &self,
        hcp_id: HcpId,
    ) -> Result<Vec<String>, AgentError> {
        let hcp = self.repos.hcps.find_hcp(hcp_id).await?;
        let recent =
            self.repos.interactions.list_interactions_for_hcp(hcp_id, SUGGESTION_HISTORY).await?;
        let prompt = suggestion_prompt(&suggestion_context(hcp.as_ref(), &recent));

        let raw = self.llm.complete(&prompt).await.map_err(AgentError::Llm)?;
        let suggestions = parse_suggestions(&raw);
        self.record(NewToolRun::new(ToolName::GenerateFollowupSuggestions, json!(suggestions)))
            .await?;
        Ok(suggestions)
    }

    /// `raw_patch` is what the caller sent and is recorded verbatim.
    pub async fn edit_interaction(
        &self,
        interaction_id: InteractionId,
        patch: &InteractionPatch,
        raw_patch: &Map<String, Value>,
    ) -> Result<Interaction, AgentError> {
        let mut audit = InteractionAudit::new(ToolName::EditInteraction)
            .with("patch", Value::Object(raw_patch.clone()));
        if !patch.ignored_keys().is_empty() {
            audit = audit.with("ignored", json!(patch.ignored_keys()));
        }

        let updated = self
            .repos
            .interactions
            .update_interaction(interaction_id, patch, Some(audit))
            .await?
            .ok_or(DomainError::InteractionNotFound(interaction_id))?;
        debug!(
            event_name = "agent.tool_run.recorded",
            tool = %ToolName::EditInteraction,
            interaction_id = interaction_id.0,
            "tool run recorded"
        );
        Ok(updated)
    }

    async fn record(&self, run: NewToolRun) -> Result<ToolRun, AgentError> {
        let stored = self.repos.tool_runs.append_tool_run(run).await?;
        debug!(
            event_name = "agent.tool_run.recorded",
            tool = %stored.tool,
            tool_run_id = stored.id,
            "tool run recorded"
        );
        Ok(stored)
    }
}
