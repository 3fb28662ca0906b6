use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Demo HCP rows shipped in `config/fixtures/demo_hcps.sql`.
pub const DEMO_HCPS: &[DemoHcp] = &[
    DemoHcp { id: 1, name: "Dr. Maya Lee", specialty: "Cardiology" },
    DemoHcp { id: 2, name: "Dr. Arjun Patel", specialty: "Endocrinology" },
    DemoHcp { id: 3, name: "Dr. Sofia Alvarez", specialty: "Oncology" },
    DemoHcp { id: 4, name: "Dr. Daniel Okafor", specialty: "Pulmonology" },
    DemoHcp { id: 5, name: "Dr. Hannah Kim", specialty: "General Practice" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoHcp {
    pub id: i64,
    pub name: &'static str,
    pub specialty: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedResult {
    pub hcps_seeded: Vec<DemoHcp>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

pub struct DemoHcpDataset;

impl DemoHcpDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_hcps.sql");

    /// Idempotent: rows that already exist are left alone.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult { hcps_seeded: DEMO_HCPS.to_vec() })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(DEMO_HCPS.len());
        for hcp in DEMO_HCPS {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM hcps WHERE id = ?1 AND name = ?2 AND specialty = ?3)",
            )
            .bind(hcp.id)
            .bind(hcp.name)
            .bind(hcp.specialty)
            .fetch_one(pool)
            .await?;
            checks.push((hcp.name, present == 1));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the demo rows along with any interactions and tool runs that
    /// reference them.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let ids = DEMO_HCPS.iter().map(|hcp| hcp.id.to_string()).collect::<Vec<_>>().join(", ");
        let mut tx = pool.begin().await?;

        sqlx::query(&format!(
            "DELETE FROM agent_tool_runs WHERE interaction_id IN
             (SELECT id FROM interactions WHERE hcp_id IN ({ids}))"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("DELETE FROM interactions WHERE hcp_id IN ({ids})"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM hcps WHERE id IN ({ids})")).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }
}
