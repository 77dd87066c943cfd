use serde::{Deserialize, Serialize};

/// Body of a create_link / clear_link call against the interconnect API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    #[serde(rename = "interconnect1IP")]
    pub interconnect1_ip: String,
    #[serde(rename = "interconnect1Prefix")]
    pub interconnect1_prefix: String,
    #[serde(rename = "interconnect2IP")]
    pub interconnect2_ip: String,
    #[serde(rename = "interconnect2Prefix")]
    pub interconnect2_prefix: String,
    #[serde(rename = "interconnectPortID1")]
    pub interconnect_port_id1: u32,
    #[serde(rename = "interconnectPortID2")]
    pub interconnect_port_id2: u32,
    pub username: String,
    pub password: String,
    pub secret: String,
}

/// Interconnect API reply; only `status` is inspected
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub device1_output: String,
    #[serde(default)]
    pub device2_output: String,
}

impl ProvisionResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    #[cfg(test)]
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn error(message: &str) -> Self {
        Self {
            status: "error".to_string(),
            message: message.to_string(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_names() {
        let req = ProvisionRequest {
            interconnect1_ip: "10.0.0.1".to_string(),
            interconnect1_prefix: "Gi1/0/".to_string(),
            interconnect2_ip: "10.0.0.2".to_string(),
            interconnect2_prefix: "Gi1/0/".to_string(),
            interconnect_port_id1: 12,
            interconnect_port_id2: 56,
            username: "admin".to_string(),
            password: "pw".to_string(),
            secret: "en".to_string(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["interconnect1IP"], "10.0.0.1");
        assert_eq!(json["interconnect2Prefix"], "Gi1/0/");
        assert_eq!(json["interconnectPortID2"], 56);
        assert_eq!(json["secret"], "en");
    }

    #[test]
    fn test_response_status() {
        let resp: ProvisionResponse =
            serde_json::from_str(r#"{"status":"success","message":"ok"}"#).unwrap();
        assert!(resp.is_success());
        assert!(!ProvisionResponse::error("boom").is_success());
        let resp: ProvisionResponse = serde_json::from_str(r#"{"status":"SUCCESS"}"#).unwrap();
        assert!(!resp.is_success());
    }
}
