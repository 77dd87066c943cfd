use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::*;

use super::row_helpers::{map_device_row, DEVICE_COLUMNS};
use super::ConflictError;

/// Result of a conditional booking-holder write
#[derive(Debug)]
pub enum HolderUpdate {
    /// The condition held and the row now carries the new holder
    Applied(Device),
    /// The row already had the requested holder; nothing was written
    Unchanged(Device),
    /// The condition failed; the device is returned as currently stored
    Rejected(Device),
    /// No device with that id
    Missing,
}

/// Device database operations
pub struct DeviceRepo;

impl DeviceRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<Device>> {
        let rows = sqlx::query(&format!("SELECT {} FROM devices ORDER BY name", DEVICE_COLUMNS))
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_device_row).collect())
    }

    pub async fn list_by_kind(pool: &Pool<Sqlite>, kind: DeviceKind) -> Result<Vec<Device>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM devices WHERE kind = ? ORDER BY name",
            DEVICE_COLUMNS
        ))
        .bind(kind.as_str())
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().map(map_device_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Device>> {
        let row = sqlx::query(&format!("SELECT {} FROM devices WHERE id = ?", DEVICE_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_device_row))
    }

    pub async fn get_by_name(pool: &Pool<Sqlite>, name: &str) -> Result<Option<Device>> {
        let row = sqlx::query(&format!("SELECT {} FROM devices WHERE name = ?", DEVICE_COLUMNS))
            .bind(name)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_device_row))
    }

    pub async fn get_by_number(pool: &Pool<Sqlite>, device_number: i32) -> Result<Option<Device>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM devices WHERE device_number = ?",
            DEVICE_COLUMNS
        ))
        .bind(device_number)
        .fetch_optional(pool)
        .await?;
        Ok(row.as_ref().map(map_device_row))
    }

    pub async fn create(pool: &Pool<Sqlite>, req: &CreateDeviceRequest) -> Result<Device> {
        // Only the two interconnect switches carry a device number, and each must have one
        match (req.kind, req.device_number) {
            (DeviceKind::Interconnect, None) => {
                return Err(ConflictError::new("interconnect devices need a device number of 1 or 2").into());
            }
            (DeviceKind::Lab, Some(_)) => {
                return Err(ConflictError::new("only interconnect devices carry a device number").into());
            }
            _ => {}
        }
        if let Some(number) = req.device_number {
            if !(1..=2).contains(&number) {
                return Err(ConflictError::new(format!("device number must be 1 or 2, got {}", number)).into());
            }
            if Self::get_by_number(pool, number).await?.is_some() {
                return Err(ConflictError::new("Device with this device number already exists").into());
            }
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO devices (name, kind, device_number, model, serial_number, description, icon,
                                 ports, ip_address, username, password, secret_password, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&req.name)
        .bind(req.kind.as_str())
        .bind(req.device_number)
        .bind(req.model.clone().unwrap_or_default())
        .bind(req.serial_number.clone().unwrap_or_default())
        .bind(req.description.clone().unwrap_or_default())
        .bind(req.icon.clone().unwrap_or_default().to_uppercase())
        .bind(&req.ports)
        .bind(req.ip_address.clone().unwrap_or_default())
        .bind(req.username.clone().unwrap_or_default())
        .bind(req.password.clone().unwrap_or_default())
        .bind(req.secret_password.clone().unwrap_or_default())
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Self::get(pool, result.last_insert_rowid())
            .await?
            .context("Device not found after creation")
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM devices WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Device", &id.to_string()).into());
        }
        Ok(())
    }

    /// Set the booking holder if the device is free.
    ///
    /// The check and the write are one conditional UPDATE, so two concurrent
    /// callers can never both observe a free device. A device already held by
    /// `user_id` comes back as `Unchanged`.
    pub async fn book(pool: &Pool<Sqlite>, id: i64, user_id: i64) -> Result<HolderUpdate> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(&format!(
            r#"UPDATE devices SET booking_holder = ?, updated_at = ?
               WHERE id = ? AND booking_holder IS NULL
               RETURNING {}"#,
            DEVICE_COLUMNS
        ))
        .bind(user_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match updated {
            Some(row) => HolderUpdate::Applied(map_device_row(&row)),
            None => match Self::current_in_tx(&mut tx, id).await? {
                HolderUpdate::Rejected(device) if device.booking_holder == Some(user_id) => {
                    HolderUpdate::Unchanged(device)
                }
                other => other,
            },
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Clear the booking holder if it is `user_id`, or any holder when `force` is set.
    pub async fn unbook(pool: &Pool<Sqlite>, id: i64, user_id: i64, force: bool) -> Result<HolderUpdate> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(&format!(
            r#"UPDATE devices SET booking_holder = NULL, updated_at = ?
               WHERE id = ? AND booking_holder IS NOT NULL AND (booking_holder = ? OR ? = 1)
               RETURNING {}"#,
            DEVICE_COLUMNS
        ))
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .bind(force as i32)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match updated {
            Some(row) => HolderUpdate::Applied(map_device_row(&row)),
            None => Self::current_in_tx(&mut tx, id).await?,
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn current_in_tx(tx: &mut sqlx::Transaction<'_, Sqlite>, id: i64) -> Result<HolderUpdate> {
        let row = sqlx::query(&format!("SELECT {} FROM devices WHERE id = ?", DEVICE_COLUMNS))
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(match row {
            Some(row) => HolderUpdate::Rejected(map_device_row(&row)),
            None => HolderUpdate::Missing,
        })
    }
}
