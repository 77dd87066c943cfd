use anyhow::Result;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::*;

use super::row_helpers::map_connection_row;

const SELECT_CONNECTION: &str = r#"
    SELECT id, lab_device_name, lab_device_port,
           interconnect_device_name, interconnect_device_port,
           created_at, updated_at
    FROM connections
"#;

/// Connection database operations
pub struct ConnectionRepo;

impl ConnectionRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<Connection>> {
        let rows = sqlx::query(&format!("{} ORDER BY lab_device_name, lab_device_port", SELECT_CONNECTION))
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_connection_row).collect())
    }

    pub async fn list_for_lab_device(pool: &Pool<Sqlite>, lab_device_name: &str) -> Result<Vec<Connection>> {
        let rows = sqlx::query(&format!(
            "{} WHERE lab_device_name = ? ORDER BY lab_device_port",
            SELECT_CONNECTION
        ))
        .bind(lab_device_name)
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().map(map_connection_row).collect())
    }

    /// Look up the connection for one lab device port
    pub async fn get_by_lab_port(pool: &Pool<Sqlite>, lab_device_name: &str, lab_device_port: &str) -> Result<Option<Connection>> {
        let row = sqlx::query(&format!(
            "{} WHERE lab_device_name = ? AND lab_device_port = ?",
            SELECT_CONNECTION
        ))
        .bind(lab_device_name)
        .bind(lab_device_port)
        .fetch_optional(pool)
        .await?;
        Ok(row.as_ref().map(map_connection_row))
    }

    /// Upsert the connection for a lab device port
    pub async fn set(pool: &Pool<Sqlite>, req: &SetConnectionRequest) -> Result<Connection> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO connections (lab_device_name, lab_device_port, interconnect_device_name,
                                     interconnect_device_port, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(lab_device_name, lab_device_port) DO UPDATE SET
                interconnect_device_name = excluded.interconnect_device_name,
                interconnect_device_port = excluded.interconnect_device_port,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&req.lab_device_name)
        .bind(&req.lab_device_port)
        .bind(req.interconnect_device_name.clone().unwrap_or_default())
        .bind(req.interconnect_device_port.clone().unwrap_or_default())
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        let row = sqlx::query(&format!(
            "{} WHERE lab_device_name = ? AND lab_device_port = ?",
            SELECT_CONNECTION
        ))
        .bind(&req.lab_device_name)
        .bind(&req.lab_device_port)
        .fetch_one(pool)
        .await?;

        Ok(map_connection_row(&row))
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM connections WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Connection", &id.to_string()).into());
        }
        Ok(())
    }
}
