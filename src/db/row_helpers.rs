use sqlx::{Row, sqlite::SqliteRow};

use crate::models::*;

/// Filter empty strings to None; the DB stores '' instead of NULL
pub fn none_if_empty(opt: Option<String>) -> Option<String> {
    opt.filter(|s| !s.is_empty())
}

/// Column list shared by every device SELECT/RETURNING clause
pub const DEVICE_COLUMNS: &str = "id, name, kind, device_number, booking_holder, model, serial_number, \
    description, icon, ports, ip_address, username, password, secret_password, created_at, updated_at";

/// Map a SQLite row to a Device struct
pub fn map_device_row(row: &SqliteRow) -> Device {
    let kind: String = row.get("kind");
    Device {
        id: row.get("id"),
        name: row.get("name"),
        kind: DeviceKind::parse(&kind).unwrap_or(DeviceKind::Lab),
        device_number: row.try_get::<Option<i32>, _>("device_number").ok().flatten(),
        booking_holder: row.try_get::<Option<i64>, _>("booking_holder").ok().flatten(),
        model: row.get("model"),
        serial_number: row.get("serial_number"),
        description: none_if_empty(row.get("description")),
        icon: none_if_empty(row.get("icon")),
        ports: row.get("ports"),
        ip_address: none_if_empty(row.get("ip_address")),
        username: none_if_empty(row.get("username")),
        password: none_if_empty(row.get("password")),
        secret_password: none_if_empty(row.get("secret_password")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Map a SQLite row to a Connection struct
pub fn map_connection_row(row: &SqliteRow) -> Connection {
    Connection {
        id: row.get("id"),
        lab_device_name: row.get("lab_device_name"),
        lab_device_port: row.get("lab_device_port"),
        interconnect_device_name: none_if_empty(row.get("interconnect_device_name")),
        interconnect_device_port: none_if_empty(row.get("interconnect_device_port")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Map a SQLite row to a Topology struct
pub fn map_topology_row(row: &SqliteRow) -> Topology {
    let graph_json: String = row.get("graph");
    let graph: GraphDocument = serde_json::from_str(&graph_json).unwrap_or_else(|e| {
        tracing::warn!("Unreadable graph document, using empty graph: {}", e);
        GraphDocument::default()
    });
    let archived: i32 = row.get("archived");
    Topology {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        archived: archived == 1,
        expires_on: row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>("expires_on").ok().flatten(),
        graph,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
