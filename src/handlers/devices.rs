use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::models::*;
use crate::AppState;

use super::{created, ApiError};

#[derive(Debug, Deserialize)]
pub struct DeviceListQuery {
    #[serde(default)]
    pub kind: Option<String>,
}

/// List devices, optionally only one kind (`?kind=lab|interconnect`)
pub async fn list_devices(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeviceListQuery>,
) -> Result<Json<Vec<Device>>, ApiError> {
    let devices = match query.kind.as_deref() {
        Some(kind) => {
            let kind = DeviceKind::parse(kind)
                .ok_or_else(|| ApiError::bad_request("kind must be LAB or INTERCONNECT"))?;
            state.store.list_devices_by_kind(kind).await?
        }
        None => state.store.list_devices().await?,
    };
    Ok(Json(devices))
}

/// Get a single device by ID
pub async fn get_device(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Device>, ApiError> {
    let device = state
        .store
        .get_device(id)
        .await?
        .ok_or_else(|| ApiError::not_found("device"))?;
    Ok(Json(device))
}

/// Create a new device
pub async fn create_device(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDeviceRequest>,
) -> Result<(StatusCode, Json<Device>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    if req.device_number.is_some() && req.kind != DeviceKind::Interconnect {
        return Err(ApiError::bad_request("only interconnect devices carry a device number"));
    }
    if req.device_number.is_none() && req.kind == DeviceKind::Interconnect {
        return Err(ApiError::bad_request("interconnect devices need a device number of 1 or 2"));
    }

    let device = state.store.create_device(&req).await?;
    Ok(created(device))
}

/// Delete a device
pub async fn delete_device(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_device(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Book a device for the caller
pub async fn book_device(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Device>, ApiError> {
    let device = state.reservations.book(id, auth.user_id()?).await?;
    Ok(Json(device))
}

/// Release the caller's booking of a device
pub async fn unbook_device(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Device>, ApiError> {
    let device = state
        .reservations
        .unbook(id, auth.user_id()?, auth.account_type())
        .await?;
    Ok(Json(device))
}

/// List the port cabling of every lab device
pub async fn list_connections(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Connection>>, ApiError> {
    let connections = state.store.list_connections().await?;
    Ok(Json(connections))
}

/// List the cabling of one lab device
pub async fn list_device_connections(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Connection>>, ApiError> {
    let device = state
        .store
        .get_device(id)
        .await?
        .ok_or_else(|| ApiError::not_found("device"))?;
    let connections = state.store.list_connections_for_device(&device.name).await?;
    Ok(Json(connections))
}

/// Record which interconnect port a lab port is cabled to
pub async fn set_connection(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetConnectionRequest>,
) -> Result<Json<Connection>, ApiError> {
    if req.lab_device_name.is_empty() || req.lab_device_port.is_empty() {
        return Err(ApiError::bad_request("lab_device_name and lab_device_port are required"));
    }
    let connection = state.store.set_connection(&req).await?;
    Ok(Json(connection))
}

/// Delete a connection record
pub async fn delete_connection(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_connection(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
