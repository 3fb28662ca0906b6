use sqlx::{Row, SqliteConnection};

use hcplog_core::audit::{decode_output, NewToolRun, ToolRun};
use hcplog_core::domain::interaction::InteractionId;

use super::{format_timestamp, now, parse_timestamp, RepositoryError, ToolRunRepository};
use crate::DbPool;

const TOOL_RUN_COLUMNS: &str = "id, interaction_id, tool, output, created_at";

pub struct SqlToolRunRepository {
    pool: DbPool,
}

impl SqlToolRunRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Appends one row on an open connection or transaction.
pub(crate) async fn insert_tool_run(
    conn: &mut SqliteConnection,
    run: &NewToolRun,
) -> Result<ToolRun, RepositoryError> {
    let created_at = now();
    let result = sqlx::query(
        "INSERT INTO agent_tool_runs (interaction_id, tool, output, created_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(run.interaction_id.map(|id| id.0))
    .bind(run.tool.as_str())
    .bind(run.serialized_output())
    .bind(format_timestamp(created_at))
    .execute(&mut *conn)
    .await?;

    Ok(ToolRun {
        id: result.last_insert_rowid(),
        interaction_id: run.interaction_id,
        tool: run.tool.as_str().to_string(),
        output: run.output.clone(),
        created_at,
    })
}

#[async_trait::async_trait]
impl ToolRunRepository for SqlToolRunRepository {
    async fn append_tool_run(&self, run: NewToolRun) -> Result<ToolRun, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_tool_run(&mut conn, &run).await
    }

    async fn list_tool_runs(&self, limit: u32) -> Result<Vec<ToolRun>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {TOOL_RUN_COLUMNS} FROM agent_tool_runs
             ORDER BY created_at DESC, id DESC
             LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_tool_run).collect()
    }

    async fn list_tool_runs_for_interaction(
        &self,
        interaction_id: InteractionId,
    ) -> Result<Vec<ToolRun>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {TOOL_RUN_COLUMNS} FROM agent_tool_runs
             WHERE interaction_id = ?
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(interaction_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_tool_run).collect()
    }
}

fn row_to_tool_run(row: &sqlx::sqlite::SqliteRow) -> Result<ToolRun, RepositoryError> {
    let interaction_id: Option<i64> = row.try_get("interaction_id")?;
    let output: Option<String> = row.try_get("output")?;

    Ok(ToolRun {
        id: row.try_get("id")?,
        interaction_id: interaction_id.map(InteractionId),
        tool: row.try_get("tool")?,
        output: decode_output(output.as_deref()),
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
