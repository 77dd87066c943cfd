use std::sync::Arc;

use thiserror::Error;

use crate::db::{HolderUpdate, Store};
use crate::models::{AccountType, Device};
use crate::ws::Hub;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Device not found: {0}")]
    DeviceNotFound(i64),

    #[error("Device {0} is already booked by another user")]
    AlreadyBooked(String),

    #[error("Not authorized to unbook device {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type BookingResult<T> = Result<T, BookingError>;

/// Enforces a single booking holder per device and announces changes.
#[derive(Clone)]
pub struct ReservationManager {
    store: Store,
    hub: Option<Arc<Hub>>,
    admin_force_unbook: bool,
}

impl ReservationManager {
    pub fn new(store: Store, hub: Option<Arc<Hub>>, admin_force_unbook: bool) -> Self {
        Self {
            store,
            hub,
            admin_force_unbook,
        }
    }

    /// Book a device for `requester`. Booking a device you already hold returns
    /// it unchanged and announces nothing.
    pub async fn book(&self, device_id: i64, requester: i64) -> BookingResult<Device> {
        match self.store.book_device(device_id, requester).await? {
            HolderUpdate::Applied(device) => {
                tracing::info!("Device {} booked by user {}", device.name, requester);
                if let Some(hub) = &self.hub {
                    hub.broadcast_device_booked(&device).await;
                }
                Ok(device)
            }
            HolderUpdate::Unchanged(device) => Ok(device),
            HolderUpdate::Rejected(device) => Err(BookingError::AlreadyBooked(device.name)),
            HolderUpdate::Missing => Err(BookingError::DeviceNotFound(device_id)),
        }
    }

    /// Release a booking. Only the holder may release it, unless elevated
    /// accounts are allowed to force it.
    pub async fn unbook(&self, device_id: i64, requester: i64, role: AccountType) -> BookingResult<Device> {
        let force = self.admin_force_unbook && role.is_elevated();
        match self.store.unbook_device(device_id, requester, force).await? {
            HolderUpdate::Applied(device) => {
                tracing::info!("Device {} unbooked by user {}", device.name, requester);
                if let Some(hub) = &self.hub {
                    hub.broadcast_device_unbooked(&device).await;
                }
                Ok(device)
            }
            HolderUpdate::Unchanged(device) => Ok(device),
            HolderUpdate::Rejected(device) => Err(BookingError::Unauthorized(device.name)),
            HolderUpdate::Missing => Err(BookingError::DeviceNotFound(device_id)),
        }
    }

    /// Release every listed device `requester` holds. Returns the ids released.
    pub async fn release_all(&self, device_ids: &[i64], requester: i64) -> Vec<i64> {
        let mut released = Vec::new();
        for &id in device_ids {
            match self.unbook(id, requester, AccountType::User).await {
                Ok(_) => released.push(id),
                Err(BookingError::Store(e)) => {
                    tracing::warn!("Failed to release device {}: {}", id, e);
                }
                Err(e) => tracing::debug!("Skipping release of device {}: {}", id, e),
            }
        }
        released
    }
}
