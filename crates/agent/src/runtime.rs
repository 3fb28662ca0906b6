use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use hcplog_core::domain::hcp::HcpId;
use hcplog_core::domain::interaction::{Interaction, InteractionId};
use hcplog_core::errors::DomainError;
use hcplog_core::flows::{
    ChatFlow, FlowEngine, IngestResult, LogResult, PipelineEvent, PipelineStage,
};
use hcplog_db::Repositories;

use crate::error::AgentError;
use crate::guardrails::GuardrailPolicy;
use crate::llm::LlmClient;
use crate::tools::AgentTools;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub hcp_id: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub interaction_id: InteractionId,
    pub suggested_followups: Vec<String>,
    pub extraction_degraded: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditRequest {
    pub interaction_id: i64,
    #[serde(default)]
    pub patch: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditResponse {
    pub updated: bool,
    pub interaction: Interaction,
}

/// Runs the fixed `ingest -> log_and_generate` chat pipeline and the
/// single-step edit workflow.
pub struct AgentRuntime {
    tools: AgentTools,
    guardrails: GuardrailPolicy,
    flow: FlowEngine<ChatFlow>,
}

impl AgentRuntime {
    pub fn new(repos: Repositories, llm: Arc<dyn LlmClient>, guardrails: GuardrailPolicy) -> Self {
        Self { tools: AgentTools::new(repos, llm), guardrails, flow: FlowEngine::default() }
    }

    pub fn tools(&self) -> &AgentTools {
        &self.tools
    }

    pub async fn run_chat(
        &self,
        request: ChatRequest,
        correlation_id: &str,
    ) -> Result<ChatResponse, AgentError> {
        let hcp_id = self.guardrails.check_chat(request.hcp_id)?;
        info!(
            event_name = "agent.chat.started",
            correlation_id,
            hcp_id = hcp_id.0,
            message_chars = request.message.chars().count(),
            "chat pipeline started"
        );

        let mut stage = self.advance(self.flow.initial_stage(), PipelineEvent::MessageReceived)?;
        let ingested = self.ingest(hcp_id, &request.message).await?;
        if let Some(reason) = &ingested.extraction.degraded {
            warn!(
                event_name = "agent.extraction.degraded",
                correlation_id,
                hcp_id = hcp_id.0,
                reason = %reason,
                "continuing with empty extraction"
            );
        }

        stage = self.advance(stage, PipelineEvent::ContextExtracted)?;
        let logged = self.log_and_generate(hcp_id, &ingested).await?;
        stage = self.advance(stage, PipelineEvent::InteractionLogged)?;

        info!(
            event_name = "agent.chat.completed",
            correlation_id,
            hcp_id = hcp_id.0,
            interaction_id = logged.interaction_id.0,
            suggestions = logged.suggestions.len(),
            stage = ?stage,
            "chat pipeline completed"
        );

        Ok(ChatResponse {
            reply: logged.reply,
            interaction_id: logged.interaction_id,
            suggested_followups: logged.suggestions,
            extraction_degraded: ingested.extraction.is_degraded(),
        })
    }

    pub async fn run_edit(
        &self,
        request: EditRequest,
        correlation_id: &str,
    ) -> Result<EditResponse, AgentError> {
        let interaction_id = InteractionId(request.interaction_id);
        let patch = self.guardrails.check_patch(&request.patch)?;
        if !patch.ignored_keys().is_empty() {
            warn!(
                event_name = "agent.edit.ignored_fields",
                correlation_id,
                interaction_id = interaction_id.0,
                ignored = ?patch.ignored_keys(),
                "patch keys outside the editable fields were ignored"
            );
        }

        let interaction = self.tools.edit_interaction(interaction_id, &patch, &request.patch).await?;
        info!(
            event_name = "agent.edit.completed",
            correlation_id,
            interaction_id = interaction_id.0,
            fields = patch.touched_fields().len(),
            "interaction edited"
        );

        Ok(EditResponse { updated: true, interaction })
    }

    async fn ingest(&self, hcp_id: HcpId, message: &str) -> Result<IngestResult, AgentError> {
        let profile = self.tools.get_hcp_profile(hcp_id).await?;
        let recent = self.tools.list_recent_interactions(hcp_id).await?;
        if profile.is_none() {
            return Err(DomainError::HcpNotFound(hcp_id).into());
        }
        let extraction = self.tools.extract_interaction(message).await?;

        Ok(IngestResult { profile, recent, extraction })
    }

    async fn log_and_generate(
        &self,
        hcp_id: HcpId,
        ingested: &IngestResult,
    ) -> Result<LogResult, AgentError> {
        let interaction = self.tools.log_interaction(hcp_id, &ingested.extraction).await?;
        let suggestions = self.tools.generate_followup_suggestions(hcp_id).await?;
        Ok(LogResult::new(interaction.id, suggestions))
    }

    fn advance(
        &self,
        stage: PipelineStage,
        event: PipelineEvent,
    ) -> Result<PipelineStage, AgentError> {
        Ok(self.flow.apply(stage, event)?.to)
    }
}
