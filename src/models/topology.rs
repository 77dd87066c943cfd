use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Topology is a user's saved lab graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<DateTime<Utc>>,
    pub graph: GraphDocument,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// CreateTopologyRequest for creating new topologies
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTopologyRequest {
    pub name: String,
    #[serde(default)]
    pub expires_on: Option<DateTime<Utc>>,
}

/// Canvas position of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Device reference stored on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDevice {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_data: Option<NodeDevice>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: NodeData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Transient provisioning state of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStatus {
    Pending,
    Success,
    Deleting,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    #[serde(default)]
    pub source_port: String,
    #[serde(default)]
    pub target_port: String,
    /// Caller-forced layout, used verbatim by the geometry engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_path_type: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EdgeStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub data: EdgeData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphEdge {
    pub fn new(source: &str, source_port: &str, target: &str, target_port: &str) -> Self {
        Self {
            id: edge_id(source, source_port, target, target_port),
            source: source.to_string(),
            target: target.to_string(),
            data: EdgeData {
                source_port: source_port.to_string(),
                target_port: target_port.to_string(),
                ..EdgeData::default()
            },
            extra: Map::new(),
        }
    }

    pub fn status(&self) -> Option<EdgeStatus> {
        self.data.status
    }
}

/// Stable edge id for a node/port pair
pub fn edge_id(source: &str, source_port: &str, target: &str, target_port: &str) -> String {
    format!("edge-{}:{}-{}:{}", source, source_port, target, target_port)
}

/// Serialized canvas state: nodes, edges and the viewport
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Value>,
}

impl GraphDocument {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Node placed for the named device
    pub fn node_for_device(&self, device_name: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| {
            n.data
                .device_data
                .as_ref()
                .is_some_and(|d| d.name == device_name)
        })
    }

    /// Device name behind a node id, falling back to the id itself
    pub fn device_name_for(&self, node_id: &str) -> String {
        self.node(node_id)
            .and_then(|n| n.data.device_data.as_ref())
            .map(|d| d.name.clone())
            .unwrap_or_else(|| node_id.to_string())
    }

    pub fn position_of(&self, node_id: &str) -> Option<Position> {
        self.node(node_id).map(|n| n.position)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn edge_mut(&mut self, id: &str) -> Option<&mut GraphEdge> {
        self.edges.iter_mut().find(|e| e.id == id)
    }

    /// Set an edge's status; returns false when the edge is gone
    pub fn set_edge_status(&mut self, id: &str, status: EdgeStatus) -> bool {
        match self.edge_mut(id) {
            Some(edge) => {
                edge.data.status = Some(status);
                true
            }
            None => false,
        }
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<GraphEdge> {
        let idx = self.edges.iter().position(|e| e.id == id)?;
        Some(self.edges.remove(idx))
    }

    /// Append an edge unless one with the same id already exists
    pub fn insert_edge(&mut self, edge: GraphEdge) -> bool {
        if self.edge(&edge.id).is_some() {
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Ids of every device referenced by a node, in node order, deduplicated
    pub fn device_ids(&self) -> Vec<i64> {
        let mut ids = Vec::new();
        for node in &self.nodes {
            if let Some(device) = &node.data.device_data {
                if !ids.contains(&device.id) {
                    ids.push(device.id);
                }
            }
        }
        ids
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn node(id: &str, device_id: i64, device_name: &str, x: f64, y: f64) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            position: Position { x, y },
            data: NodeData {
                device_data: Some(NodeDevice {
                    id: device_id,
                    name: device_name.to_string(),
                    extra: Map::new(),
                }),
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_document_roundtrip_keeps_unknown_fields() {
        let raw = r#"{
            "nodes": [{"id": "n1", "type": "Router", "position": {"x": 1, "y": 2},
                       "data": {"deviceData": {"id": 7, "name": "r1"}, "label": "R1"}}],
            "edges": [{"id": "e1", "source": "n1", "target": "n2", "type": "Custom",
                       "data": {"sourcePort": "Gi0/1", "targetPort": "Gi0/2", "status": "failed"}}],
            "viewport": {"x": 0, "y": 0, "zoom": 1}
        }"#;
        let doc: GraphDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.device_name_for("n1"), "r1");
        assert_eq!(doc.device_name_for("n2"), "n2");
        assert_eq!(doc.edges[0].status(), Some(EdgeStatus::Failed));
        assert_eq!(doc.device_ids(), vec![7]);

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["nodes"][0]["type"], "Router");
        assert_eq!(back["nodes"][0]["data"]["label"], "R1");
        assert_eq!(back["edges"][0]["type"], "Custom");
        assert_eq!(back["edges"][0]["data"]["sourcePort"], "Gi0/1");
    }

    #[test]
    fn test_edge_insert_and_remove() {
        let mut doc = GraphDocument::default();
        assert!(doc.insert_edge(GraphEdge::new("a", "p1", "b", "p2")));
        assert!(!doc.insert_edge(GraphEdge::new("a", "p1", "b", "p2")));
        let id = edge_id("a", "p1", "b", "p2");
        assert!(doc.set_edge_status(&id, EdgeStatus::Pending));
        assert_eq!(doc.edge(&id).and_then(|e| e.status()), Some(EdgeStatus::Pending));
        assert!(doc.remove_edge(&id).is_some());
        assert!(!doc.set_edge_status(&id, EdgeStatus::Failed));
    }

    #[test]
    fn test_node_for_device() {
        let doc = GraphDocument {
            nodes: vec![fixtures::node("n1", 1, "r1", 0.0, 0.0)],
            ..GraphDocument::default()
        };
        assert_eq!(doc.node_for_device("r1").map(|n| n.id.as_str()), Some("n1"));
        assert!(doc.node_for_device("r2").is_none());
    }
}
