use sqlx::Row;

use hcplog_core::domain::hcp::{Hcp, HcpId, NewHcp};

use super::{HcpRepository, RepositoryError};
use crate::DbPool;

pub struct SqlHcpRepository {
    pool: DbPool,
}

impl SqlHcpRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HcpRepository for SqlHcpRepository {
    async fn find_hcp(&self, id: HcpId) -> Result<Option<Hcp>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, specialty, organization FROM hcps WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_hcp).transpose()
    }

    async fn list_hcps(&self) -> Result<Vec<Hcp>, RepositoryError> {
        let rows =
            sqlx::query("SELECT id, name, specialty, organization FROM hcps ORDER BY name, id")
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_hcp).collect()
    }

    async fn insert_hcp(&self, hcp: NewHcp) -> Result<Hcp, RepositoryError> {
        let result =
            sqlx::query("INSERT INTO hcps (name, specialty, organization) VALUES (?, ?, ?)")
                .bind(&hcp.name)
                .bind(&hcp.specialty)
                .bind(&hcp.organization)
                .execute(&self.pool)
                .await?;

        Ok(Hcp {
            id: HcpId(result.last_insert_rowid()),
            name: hcp.name,
            specialty: hcp.specialty,
            organization: hcp.organization,
        })
    }
}

fn row_to_hcp(row: &sqlx::sqlite::SqliteRow) -> Result<Hcp, RepositoryError> {
    Ok(Hcp {
        id: HcpId(row.try_get("id")?),
        name: row.try_get("name")?,
        specialty: row.try_get("specialty")?,
        organization: row.try_get("organization")?,
    })
}
