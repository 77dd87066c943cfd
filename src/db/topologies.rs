use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::*;
use super::row_helpers::map_topology_row;

const SELECT_TOPOLOGY: &str = r#"
    SELECT id, owner_id, name, graph, archived, expires_on, created_at, updated_at
    FROM topologies
"#;

/// Topology database operations
pub struct TopologyRepo;

impl TopologyRepo {
    /// Topologies owned by a user, oldest first
    pub async fn list_for_owner(pool: &Pool<Sqlite>, owner_id: i64, archived: bool) -> Result<Vec<Topology>> {
        let rows = sqlx::query(&format!(
            "{} WHERE owner_id = ? AND archived = ? ORDER BY created_at, id",
            SELECT_TOPOLOGY
        ))
        .bind(owner_id)
        .bind(archived as i32)
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().map(map_topology_row).collect())
    }

    /// Every user's topologies (administrator view)
    pub async fn list_all(pool: &Pool<Sqlite>, archived: bool) -> Result<Vec<Topology>> {
        let rows = sqlx::query(&format!(
            "{} WHERE archived = ? ORDER BY created_at, id",
            SELECT_TOPOLOGY
        ))
        .bind(archived as i32)
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().map(map_topology_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Topology>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_TOPOLOGY))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_topology_row))
    }

    pub async fn create(pool: &Pool<Sqlite>, owner_id: i64, req: &CreateTopologyRequest) -> Result<Topology> {
        let now = Utc::now();
        let graph = serde_json::to_string(&GraphDocument::default())?;
        let result = sqlx::query(
            r#"INSERT INTO topologies (owner_id, name, graph, archived, expires_on, created_at, updated_at)
               VALUES (?, ?, ?, 0, ?, ?, ?)"#,
        )
        .bind(owner_id)
        .bind(&req.name)
        .bind(&graph)
        .bind(req.expires_on)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Self::get(pool, result.last_insert_rowid())
            .await?
            .context("Topology not found after creation")
    }

    /// Replace the stored graph document
    pub async fn update_graph(pool: &Pool<Sqlite>, id: i64, graph: &GraphDocument) -> Result<Topology> {
        let data = serde_json::to_string(graph).context("Failed to serialize graph document")?;
        let result = sqlx::query("UPDATE topologies SET graph = ?, updated_at = ? WHERE id = ?")
            .bind(&data)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Topology", &id.to_string()).into());
        }

        Self::get(pool, id)
            .await?
            .context("Topology not found after update")
    }

    pub async fn set_archived(pool: &Pool<Sqlite>, id: i64, archived: bool) -> Result<Topology> {
        let result = sqlx::query("UPDATE topologies SET archived = ?, updated_at = ? WHERE id = ?")
            .bind(archived as i32)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Topology", &id.to_string()).into());
        }

        Self::get(pool, id)
            .await?
            .context("Topology not found after update")
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM topologies WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Topology", &id.to_string()).into());
        }
        Ok(())
    }
}
