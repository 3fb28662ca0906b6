use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use hcplog_core::audit::{InteractionAudit, NewToolRun, ToolRun};
use hcplog_core::domain::hcp::{Hcp, HcpId, NewHcp};
use hcplog_core::domain::interaction::{
    Interaction, InteractionId, InteractionPatch, NewInteraction,
};

use super::{
    now, HcpRepository, InteractionRepository, RepositoryError, ToolRunRepository,
};

/// One lock over all three tables so that a write and its tool run land
/// together, like the SQL transaction.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    hcps: BTreeMap<i64, Hcp>,
    interactions: BTreeMap<i64, Interaction>,
    tool_runs: Vec<ToolRun>,
    last_hcp_id: i64,
    last_interaction_id: i64,
    last_tool_run_id: i64,
}

impl MemoryState {
    fn push_tool_run(&mut self, run: NewToolRun, created_at: DateTime<Utc>) -> ToolRun {
        self.last_tool_run_id += 1;
        let stored = ToolRun {
            id: self.last_tool_run_id,
            interaction_id: run.interaction_id,
            tool: run.tool.as_str().to_string(),
            output: run.output,
            created_at,
        };
        self.tool_runs.push(stored.clone());
        stored
    }
}

fn newest_first(mut rows: Vec<Interaction>, limit: u32) -> Vec<Interaction> {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    rows.truncate(limit as usize);
    rows
}

#[async_trait::async_trait]
impl HcpRepository for InMemoryStore {
    async fn find_hcp(&self, id: HcpId) -> Result<Option<Hcp>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.hcps.get(&id.0).cloned())
    }

    async fn list_hcps(&self) -> Result<Vec<Hcp>, RepositoryError> {
        let state = self.state.read().await;
        let mut hcps: Vec<Hcp> = state.hcps.values().cloned().collect();
        hcps.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(hcps)
    }

    async fn insert_hcp(&self, hcp: NewHcp) -> Result<Hcp, RepositoryError> {
        let mut state = self.state.write().await;
        state.last_hcp_id += 1;
        let stored = Hcp {
            id: HcpId(state.last_hcp_id),
            name: hcp.name,
            specialty: hcp.specialty,
            organization: hcp.organization,
        };
        state.hcps.insert(stored.id.0, stored.clone());
        Ok(stored)
    }
}

#[async_trait::async_trait]
impl InteractionRepository for InMemoryStore {
    async fn find_interaction(
        &self,
        id: InteractionId,
    ) -> Result<Option<Interaction>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.interactions.get(&id.0).cloned())
    }

    async fn list_interactions(&self, limit: u32) -> Result<Vec<Interaction>, RepositoryError> {
        let state = self.state.read().await;
        Ok(newest_first(state.interactions.values().cloned().collect(), limit))
    }

    async fn list_interactions_for_hcp(
        &self,
        hcp_id: HcpId,
        limit: u32,
    ) -> Result<Vec<Interaction>, RepositoryError> {
        let state = self.state.read().await;
        let rows =
            state.interactions.values().filter(|row| row.hcp_id == hcp_id).cloned().collect();
        Ok(newest_first(rows, limit))
    }

    async fn create_interaction(
        &self,
        interaction: NewInteraction,
        audit: Option<InteractionAudit>,
    ) -> Result<Interaction, RepositoryError> {
        let mut state = self.state.write().await;
        if !state.hcps.contains_key(&interaction.hcp_id.0) {
            return Err(RepositoryError::Integrity(format!(
                "interaction references unknown hcp {}",
                interaction.hcp_id
            )));
        }

        let created_at = now();
        state.last_interaction_id += 1;
        let stored = Interaction {
            id: InteractionId(state.last_interaction_id),
            hcp_id: interaction.hcp_id,
            fields: interaction.fields,
            created_at,
            updated_at: created_at,
        };
        state.interactions.insert(stored.id.0, stored.clone());
        if let Some(audit) = audit {
            state.push_tool_run(audit.into_tool_run(stored.id), created_at);
        }
        Ok(stored)
    }

    async fn update_interaction(
        &self,
        id: InteractionId,
        patch: &InteractionPatch,
        audit: Option<InteractionAudit>,
    ) -> Result<Option<Interaction>, RepositoryError> {
        let mut state = self.state.write().await;
        let updated_at = now();
        let Some(row) = state.interactions.get_mut(&id.0) else {
            return Ok(None);
        };

        patch.apply_to(&mut row.fields);
        row.updated_at = updated_at;
        let updated = row.clone();
        if let Some(audit) = audit {
            state.push_tool_run(audit.into_tool_run(id), updated_at);
        }
        Ok(Some(updated))
    }
}

#[async_trait::async_trait]
impl ToolRunRepository for InMemoryStore {
    async fn append_tool_run(&self, run: NewToolRun) -> Result<ToolRun, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state.push_tool_run(run, now()))
    }

    async fn list_tool_runs(&self, limit: u32) -> Result<Vec<ToolRun>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.tool_runs.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn list_tool_runs_for_interaction(
        &self,
        interaction_id: InteractionId,
    ) -> Result<Vec<ToolRun>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .tool_runs
            .iter()
            .filter(|run| run.interaction_id == Some(interaction_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use hcplog_core::audit::{InteractionAudit, NewToolRun, ToolName};
    use hcplog_core::domain::hcp::{HcpId, NewHcp};
    use hcplog_core::domain::interaction::{
        InteractionField, InteractionFields, InteractionPatch, NewInteraction,
    };

    use super::InMemoryStore;
    use crate::repositories::{HcpRepository, InteractionRepository, ToolRunRepository};

    #[tokio::test]
    async fn in_memory_hcp_round_trip() {
        let store = InMemoryStore::default();
        let hcp = store
            .insert_hcp(NewHcp {
                name: "Dr. Lee".to_string(),
                specialty: Some("Oncology".to_string()),
                organization: Some("City Hospital".to_string()),
            })
            .await
            .expect("insert");

        assert_eq!(store.find_hcp(hcp.id).await.expect("find"), Some(hcp));
        assert_eq!(store.find_hcp(HcpId(99)).await.expect("find"), None);
    }

    #[tokio::test]
    async fn in_memory_interaction_rejects_unknown_hcp() {
        let store = InMemoryStore::default();
        let result = store
            .create_interaction(
                NewInteraction { hcp_id: HcpId(5), fields: InteractionFields::default() },
                Some(InteractionAudit::new(ToolName::LogInteraction)),
            )
            .await;

        assert!(result.is_err());
        assert!(store.list_tool_runs(30).await.expect("runs").is_empty());
    }

    #[tokio::test]
    async fn in_memory_update_records_audit_with_the_row() {
        let store = InMemoryStore::default();
        let hcp = store
            .insert_hcp(NewHcp { name: "Dr. Lee".to_string(), specialty: None, organization: None })
            .await
            .expect("insert");
        let created = store
            .create_interaction(
                NewInteraction { hcp_id: hcp.id, fields: InteractionFields::default() },
                None,
            )
            .await
            .expect("create");

        let patch =
            InteractionPatch::default().set(InteractionField::Outcomes, Some("agreed".into()));
        let updated = store
            .update_interaction(
                created.id,
                &patch,
                Some(InteractionAudit::new(ToolName::EditInteraction)),
            )
            .await
            .expect("update")
            .expect("exists");

        assert_eq!(updated.fields.outcomes.as_deref(), Some("agreed"));
        let runs = store.list_tool_runs_for_interaction(created.id).await.expect("runs");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].output["interaction_id"], json!(created.id.0));
    }

    #[tokio::test]
    async fn in_memory_tool_runs_list_newest_first() {
        let store = InMemoryStore::default();
        for tool in [ToolName::GetHcpProfile, ToolName::ListRecentInteractions] {
            store.append_tool_run(NewToolRun::new(tool, json!({}))).await.expect("append");
        }

        let tools: Vec<String> =
            store.list_tool_runs(30).await.expect("runs").into_iter().map(|run| run.tool).collect();
        assert_eq!(tools, vec!["list_recent_interactions", "get_hcp_profile"]);
    }
}
