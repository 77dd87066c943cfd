use serde::{Deserialize, Serialize};

/// Direction of a link operation against the interconnect API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkOp {
    Create,
    Delete,
}

impl std::fmt::Display for LinkOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkOp::Create => write!(f, "create"),
            LinkOp::Delete => write!(f, "delete"),
        }
    }
}

/// One logical link: a lab device port on each end
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkPair {
    pub first_device: String,
    pub first_port: String,
    pub second_device: String,
    pub second_port: String,
}

impl LinkPair {
    pub fn new(first_device: &str, first_port: &str, second_device: &str, second_port: &str) -> Self {
        Self {
            first_device: first_device.to_string(),
            first_port: first_port.to_string(),
            second_device: second_device.to_string(),
            second_port: second_port.to_string(),
        }
    }
}

impl std::fmt::Display for LinkPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} <-> {}:{}",
            self.first_device, self.first_port, self.second_device, self.second_port
        )
    }
}

/// Per-pair outcome of a bulk operation
#[derive(Debug, Clone, Serialize)]
pub struct LinkOperationResult {
    pub pair: LinkPair,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate of a bulk operation
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSummary {
    pub num_failed: usize,
    pub num_succeeded: usize,
    pub results: Vec<LinkOperationResult>,
}

impl BulkSummary {
    pub fn from_results(results: Vec<LinkOperationResult>) -> Self {
        let num_succeeded = results.iter().filter(|r| r.success).count();
        Self {
            num_failed: results.len() - num_succeeded,
            num_succeeded,
            results,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.num_failed == 0
    }
}

/// Request body for single-link endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct LinkRequestBody {
    #[serde(flatten)]
    pub pair: LinkPair,
}

/// Request body for bulk endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct BulkLinkRequest {
    pub pairs: Vec<LinkPair>,
}

/// Request body for topology-scoped link deletion; empty means every edge
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopologyLinkDeleteRequest {
    #[serde(default)]
    pub edge_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(success: bool) -> LinkOperationResult {
        LinkOperationResult {
            pair: LinkPair::new("a", "1", "b", "2"),
            success,
            error: None,
        }
    }

    #[test]
    fn test_bulk_summary_counts() {
        let summary = BulkSummary::from_results(vec![result(true), result(false), result(true)]);
        assert_eq!(summary.num_failed, 1);
        assert_eq!(summary.num_succeeded, 2);
        assert!(!summary.all_succeeded());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["numFailed"], 1);
        assert_eq!(json["numSucceeded"], 2);
    }

    #[test]
    fn test_empty_bulk_summary_succeeds() {
        let summary = BulkSummary::from_results(Vec::new());
        assert!(summary.all_succeeded());
        assert_eq!(summary.num_succeeded, 0);
    }
}
