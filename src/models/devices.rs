use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ports::expand_port_range;

/// Whether a device is bookable lab equipment or one of the interconnect
/// switches that patch lab ports together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceKind {
    Lab,
    Interconnect,
}

impl DeviceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceKind::Lab => "LAB",
            DeviceKind::Interconnect => "INTERCONNECT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "LAB" => Some(DeviceKind::Lab),
            "INTERCONNECT" => Some(DeviceKind::Interconnect),
            _ => None,
        }
    }
}

/// Device represents a lab device or interconnect switch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub kind: DeviceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_number: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_holder: Option<i64>,
    pub model: String,
    pub serial_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub ports: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(skip_serializing)]
    pub secret_password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Device {
    pub fn is_interconnect(&self) -> bool {
        self.kind == DeviceKind::Interconnect
    }

    pub fn is_booked(&self) -> bool {
        self.booking_holder.is_some()
    }

    /// Discrete port names from the range notation in `ports`
    pub fn port_names(&self) -> Vec<String> {
        expand_port_range(&self.ports)
    }

    /// Devices without a port definition accept any port name
    pub fn has_port(&self, port: &str) -> bool {
        self.ports.is_empty() || self.port_names().iter().any(|p| p == port)
    }
}

/// CreateDeviceRequest for creating new devices
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceRequest {
    pub name: String,
    pub kind: DeviceKind,
    #[serde(default)]
    pub device_number: Option<i32>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub ports: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub secret_password: Option<String>,
}

impl CreateDeviceRequest {
    /// Minimal lab device request
    pub fn lab(name: &str, ports: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: DeviceKind::Lab,
            device_number: None,
            model: None,
            serial_number: None,
            description: None,
            icon: None,
            ports: ports.to_string(),
            ip_address: None,
            username: None,
            password: None,
            secret_password: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_kind_parse() {
        assert_eq!(DeviceKind::parse("lab"), Some(DeviceKind::Lab));
        assert_eq!(DeviceKind::parse("INTERCONNECT"), Some(DeviceKind::Interconnect));
        assert_eq!(DeviceKind::parse("router"), None);
        assert_eq!(DeviceKind::Interconnect.as_str(), "INTERCONNECT");
    }

    #[test]
    fn test_credentials_not_serialized() {
        let now = Utc::now();
        let device = Device {
            id: 1,
            name: "ic-1".to_string(),
            kind: DeviceKind::Interconnect,
            device_number: Some(1),
            booking_holder: None,
            model: String::new(),
            serial_number: String::new(),
            description: None,
            icon: None,
            ports: "Gi1/0/|1-2".to_string(),
            ip_address: Some("10.0.0.1".to_string()),
            username: Some("admin".to_string()),
            password: Some("hunter2".to_string()),
            secret_password: Some("enable".to_string()),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&device).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("enable"));
        assert!(json.contains("\"kind\":\"INTERCONNECT\""));
        assert!(device.has_port("Gi1/0/2"));
        assert!(!device.has_port("Gi1/0/3"));
    }
}
