use sqlx::{Row, SqliteConnection};

use hcplog_core::audit::InteractionAudit;
use hcplog_core::domain::hcp::HcpId;
use hcplog_core::domain::interaction::{
    Interaction, InteractionFields, InteractionId, InteractionPatch, NewInteraction,
};

use super::tool_run::insert_tool_run;
use super::{format_timestamp, now, parse_timestamp, InteractionRepository, RepositoryError};
use crate::DbPool;

const INTERACTION_COLUMNS: &str = "id, hcp_id, interaction_type, sentiment, topics, outcomes, \
     follow_up_actions, attendees, materials, samples, created_at, updated_at";

pub struct SqlInteractionRepository {
    pool: DbPool,
}

impl SqlInteractionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

async fn fetch_interaction(
    conn: &mut SqliteConnection,
    id: InteractionId,
) -> Result<Option<Interaction>, RepositoryError> {
    let row = sqlx::query(&format!("SELECT {INTERACTION_COLUMNS} FROM interactions WHERE id = ?"))
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(row_to_interaction).transpose()
}

#[async_trait::async_trait]
impl InteractionRepository for SqlInteractionRepository {
    async fn find_interaction(
        &self,
        id: InteractionId,
    ) -> Result<Option<Interaction>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_interaction(&mut conn, id).await
    }

    async fn list_interactions(&self, limit: u32) -> Result<Vec<Interaction>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {INTERACTION_COLUMNS} FROM interactions
             ORDER BY created_at DESC, id DESC
             LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_interaction).collect()
    }

    async fn list_interactions_for_hcp(
        &self,
        hcp_id: HcpId,
        limit: u32,
    ) -> Result<Vec<Interaction>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {INTERACTION_COLUMNS} FROM interactions
             WHERE hcp_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ?"
        ))
        .bind(hcp_id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_interaction).collect()
    }

    async fn create_interaction(
        &self,
        interaction: NewInteraction,
        audit: Option<InteractionAudit>,
    ) -> Result<Interaction, RepositoryError> {
        let created_at = now();
        let stamp = format_timestamp(created_at);
        let fields = &interaction.fields;

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO interactions (
                hcp_id, interaction_type, sentiment, topics, outcomes,
                follow_up_actions, attendees, materials, samples, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(interaction.hcp_id.0)
        .bind(&fields.interaction_type)
        .bind(&fields.sentiment)
        .bind(&fields.topics)
        .bind(&fields.outcomes)
        .bind(&fields.follow_up_actions)
        .bind(&fields.attendees)
        .bind(&fields.materials)
        .bind(&fields.samples)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&mut *tx)
        .await?;

        let id = InteractionId(result.last_insert_rowid());
        if let Some(audit) = audit {
            insert_tool_run(&mut tx, &audit.into_tool_run(id)).await?;
        }
        tx.commit().await?;

        Ok(Interaction {
            id,
            hcp_id: interaction.hcp_id,
            fields: interaction.fields,
            created_at,
            updated_at: created_at,
        })
    }

    async fn update_interaction(
        &self,
        id: InteractionId,
        patch: &InteractionPatch,
        audit: Option<InteractionAudit>,
    ) -> Result<Option<Interaction>, RepositoryError> {
        let updated_at = now();
        let stamp = format_timestamp(updated_at);

        // Write first so the transaction holds the write lock before it reads;
        // a read-then-write upgrade fails with SQLITE_BUSY under contention.
        let mut tx = self.pool.begin().await?;
        let touched = sqlx::query("UPDATE interactions SET updated_at = ? WHERE id = ?")
            .bind(&stamp)
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Ok(None);
        }
        let Some(mut interaction) = fetch_interaction(&mut tx, id).await? else {
            return Ok(None);
        };

        patch.apply_to(&mut interaction.fields);
        interaction.updated_at = updated_at;
        let fields = &interaction.fields;

        sqlx::query(
            "UPDATE interactions SET
                interaction_type = ?, sentiment = ?, topics = ?, outcomes = ?,
                follow_up_actions = ?, attendees = ?, materials = ?, samples = ?,
                updated_at = ?
             WHERE id = ?",
        )
        .bind(&fields.interaction_type)
        .bind(&fields.sentiment)
        .bind(&fields.topics)
        .bind(&fields.outcomes)
        .bind(&fields.follow_up_actions)
        .bind(&fields.attendees)
        .bind(&fields.materials)
        .bind(&fields.samples)
        .bind(&stamp)
        .bind(id.0)
        .execute(&mut *tx)
        .await?;

        if let Some(audit) = audit {
            insert_tool_run(&mut tx, &audit.into_tool_run(id)).await?;
        }
        tx.commit().await?;

        Ok(Some(interaction))
    }
}

fn row_to_interaction(row: &sqlx::sqlite::SqliteRow) -> Result<Interaction, RepositoryError> {
    Ok(Interaction {
        id: InteractionId(row.try_get("id")?),
        hcp_id: HcpId(row.try_get("hcp_id")?),
        fields: InteractionFields {
            interaction_type: row.try_get("interaction_type")?,
            sentiment: row.try_get("sentiment")?,
            topics: row.try_get("topics")?,
            outcomes: row.try_get("outcomes")?,
            follow_up_actions: row.try_get("follow_up_actions")?,
            attendees: row.try_get("attendees")?,
            materials: row.try_get("materials")?,
            samples: row.try_get("samples")?,
        },
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use hcplog_core::audit::{InteractionAudit, ToolName};
    use hcplog_core::domain::hcp::{HcpId, NewHcp};
    use hcplog_core::domain::interaction::{
        InteractionField, InteractionFields, InteractionId, InteractionPatch, NewInteraction,
    };

    use crate::repositories::{
        HcpRepository, InteractionRepository, Repositories, ToolRunRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> (Repositories, HcpId) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repos = Repositories::sql(pool);
        let hcp = repos
            .hcps
            .insert_hcp(NewHcp { name: "Dr. Lee".to_string(), specialty: None, organization: None })
            .await
            .expect("insert hcp");
        (repos, hcp.id)
    }

    fn topics(value: &str) -> InteractionFields {
        InteractionFields { topics: Some(value.to_string()), ..InteractionFields::default() }
    }

    #[tokio::test]
    async fn create_writes_row_and_audit_together() {
        let (repos, hcp_id) = setup().await;
        let created = repos
            .interactions
            .create_interaction(
                NewInteraction { hcp_id, fields: topics("Drug X efficacy") },
                Some(InteractionAudit::new(ToolName::LogInteraction).with("fields", json!({}))),
            )
            .await
            .expect("create");

        let stored = repos.interactions.find_interaction(created.id).await.expect("find");
        assert_eq!(stored, Some(created.clone()));

        let runs =
            repos.tool_runs.list_tool_runs_for_interaction(created.id).await.expect("runs");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].tool, "log_interaction");
        assert_eq!(runs[0].output["interaction_id"], json!(created.id.0));
    }

    #[tokio::test]
    async fn create_for_unknown_hcp_fails_without_audit() {
        let (repos, _) = setup().await;
        let result = repos
            .interactions
            .create_interaction(
                NewInteraction { hcp_id: HcpId(999), fields: InteractionFields::default() },
                Some(InteractionAudit::new(ToolName::LogInteraction)),
            )
            .await;

        assert!(result.is_err());
        assert!(repos.tool_runs.list_tool_runs(30).await.expect("runs").is_empty());
    }

    #[tokio::test]
    async fn recent_for_hcp_is_newest_first_and_limited() {
        let (repos, hcp_id) = setup().await;
        for index in 0..7 {
            repos
                .interactions
                .create_interaction(
                    NewInteraction { hcp_id, fields: topics(&format!("topic {index}")) },
                    None,
                )
                .await
                .expect("create");
        }

        let recent = repos.interactions.list_interactions_for_hcp(hcp_id, 5).await.expect("list");
        let seen: Vec<_> = recent.iter().filter_map(|row| row.fields.topics.clone()).collect();
        assert_eq!(seen, vec!["topic 6", "topic 5", "topic 4", "topic 3", "topic 2"]);
    }

    #[tokio::test]
    async fn update_applies_patch_and_refreshes_updated_at() {
        let (repos, hcp_id) = setup().await;
        let created = repos
            .interactions
            .create_interaction(NewInteraction { hcp_id, fields: topics("Drug X") }, None)
            .await
            .expect("create");

        let patch = InteractionPatch::default()
            .set(InteractionField::Sentiment, Some("neutral".to_string()));
        let updated = repos
            .interactions
            .update_interaction(
                created.id,
                &patch,
                Some(InteractionAudit::new(ToolName::EditInteraction)),
            )
            .await
            .expect("update")
            .expect("row exists");

        assert_eq!(updated.fields.sentiment.as_deref(), Some("neutral"));
        assert_eq!(updated.fields.topics.as_deref(), Some("Drug X"));
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);

        let runs =
            repos.tool_runs.list_tool_runs_for_interaction(created.id).await.expect("runs");
        assert_eq!(runs.len(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_row_writes_nothing() {
        let (repos, _) = setup().await;
        let outcome = repos
            .interactions
            .update_interaction(
                InteractionId(404),
                &InteractionPatch::default(),
                Some(InteractionAudit::new(ToolName::EditInteraction)),
            )
            .await
            .expect("update");

        assert_eq!(outcome, None);
        assert!(repos.tool_runs.list_tool_runs(30).await.expect("runs").is_empty());
    }
}
