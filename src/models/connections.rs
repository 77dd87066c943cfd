use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection records the physical cabling from a lab device port to an
/// interconnect switch port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: i64,
    pub lab_device_name: String,
    pub lab_device_port: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interconnect_device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interconnect_device_port: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    /// Interconnect side, if the connection has been cabled
    pub fn interconnect(&self) -> Option<(&str, &str)> {
        match (&self.interconnect_device_name, &self.interconnect_device_port) {
            (Some(name), Some(port)) => Some((name.as_str(), port.as_str())),
            _ => None,
        }
    }
}

/// SetConnectionRequest upserts the connection for a lab device port
#[derive(Debug, Clone, Deserialize)]
pub struct SetConnectionRequest {
    pub lab_device_name: String,
    pub lab_device_port: String,
    #[serde(default)]
    pub interconnect_device_name: Option<String>,
    #[serde(default)]
    pub interconnect_device_port: Option<String>,
}

impl SetConnectionRequest {
    pub fn new(lab_device: &str, lab_port: &str, interconnect: &str, interconnect_port: &str) -> Self {
        Self {
            lab_device_name: lab_device.to_string(),
            lab_device_port: lab_port.to_string(),
            interconnect_device_name: Some(interconnect.to_string()),
            interconnect_device_port: Some(interconnect_port.to_string()),
        }
    }
}
